/// BERT for Text Classification (such as news topic classification)
pub mod text_classification;
