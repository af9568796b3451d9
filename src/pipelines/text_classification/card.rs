use serde::Serialize;

use super::{config::Training, evaluation::EvalReport};

/// The model card body, rendered beneath the YAML front matter
static TEMPLATE: &str = r#"# {{ model_id }}

This model is a fine-tuned version of [{{ base_model }}](https://huggingface.co/{{ base_model }}) on the {{ dataset }} dataset ({{ train_split }}).
It achieves the following results on the evaluation set ({{ eval_split }}):

- Loss: {{ avg_loss }}
- F1 ({{ average }}): {{ f1 }}
- Accuracy: {{ accuracy }}

## Labels

| ID | Label | Precision | Recall | F1 | Support |
|----|-------|-----------|--------|----|---------|
{% for class in classes %}| {{ class.id }} | {{ class.label }} | {{ class.precision }} | {{ class.recall }} | {{ class.f1 }} | {{ class.support }} |
{% endfor %}
## Training hyperparameters

- learning_rate: {{ learning_rate }}
- train_batch_size: {{ train_batch_size }}
- eval_batch_size: {{ eval_batch_size }}
- seed: {{ seed }}
- optimizer: AdamW with epsilon={{ adam_epsilon }} and weight_decay={{ weight_decay }}
- lr_scheduler_type: linear
- num_epochs: {{ num_epochs }}

## Framework versions

- Burn {{ burn_version }}
"#;

/// Hugging Face model card metadata
#[derive(Serialize)]
struct FrontMatter<'a> {
    library_name: &'a str,
    base_model: &'a str,
    datasets: Vec<&'a str>,
    metrics: Vec<&'a str>,
    pipeline_tag: &'a str,
    tags: Vec<&'a str>,
}

#[derive(Serialize)]
struct ClassRow {
    id: usize,
    label: String,
    precision: String,
    recall: String,
    f1: String,
    support: usize,
}

#[derive(Serialize)]
struct Context<'a> {
    model_id: &'a str,
    base_model: &'a str,
    dataset: &'a str,
    train_split: &'a str,
    eval_split: &'a str,
    avg_loss: String,
    average: String,
    f1: String,
    accuracy: String,
    classes: Vec<ClassRow>,
    learning_rate: String,
    train_batch_size: usize,
    eval_batch_size: usize,
    seed: u64,
    adam_epsilon: String,
    weight_decay: String,
    num_epochs: usize,
    burn_version: &'a str,
}

/// Render a README.md model card, with YAML front matter, for a fine-tuned model
pub fn render(model_id: &str, config: &Training, report: &EvalReport) -> anyhow::Result<String> {
    let front_matter = serde_yaml::to_string(&FrontMatter {
        library_name: "burn",
        base_model: &config.model_name,
        datasets: vec![&config.dataset_name],
        metrics: vec!["f1", "accuracy"],
        pipeline_tag: "text-classification",
        tags: vec!["generated_from_trainer", "text-classification"],
    })?;

    let context = Context {
        model_id,
        base_model: &config.model_name,
        dataset: &config.dataset_name,
        train_split: &config.train_split,
        eval_split: &config.eval_split,
        avg_loss: format!("{:.4}", report.avg_loss),
        average: report.average.to_string(),
        f1: format!("{:.4}", report.f1),
        accuracy: format!("{:.4}", report.accuracy),
        classes: report
            .per_class
            .iter()
            .enumerate()
            .map(|(id, class)| ClassRow {
                id,
                label: class.label.clone(),
                precision: format!("{:.4}", class.precision),
                recall: format!("{:.4}", class.recall),
                f1: format!("{:.4}", class.f1),
                support: class.support,
            })
            .collect(),
        learning_rate: format!("{:e}", config.learning_rate),
        train_batch_size: config.train_batch_size,
        eval_batch_size: config.eval_batch_size,
        seed: config.seed,
        adam_epsilon: format!("{:e}", config.adam_epsilon),
        weight_decay: config.weight_decay.to_string(),
        num_epochs: config.num_epochs,
        burn_version: "0.13",
    };

    let template = liquid::ParserBuilder::with_stdlib()
        .build()?
        .parse(TEMPLATE)?;

    let body = template.render(&liquid::to_object(&context)?)?;

    Ok(format!("---\n{front_matter}---\n\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datasets::ag_news,
        pipelines::text_classification::metric::{Average, ConfusionMatrix},
    };

    #[test]
    fn test_render() -> anyhow::Result<()> {
        let labels = ag_news::labels();
        let config = Training::new(labels.names());
        let matrix = ConfusionMatrix::from_predictions(4, &[0, 1, 2, 3], &[0, 1, 2, 2]);
        let report = EvalReport::new(&matrix, &labels, Average::Weighted, 0.25, 10);

        let card = render("agnews-bert", &config, &report)?;

        assert!(card.starts_with("---\nlibrary_name: burn\n"));
        assert!(card.contains("base_model: bert-base-uncased"));
        assert!(card.contains("pipeline_tag: text-classification"));
        assert!(card.contains("# agnews-bert"));
        assert!(card.contains("- Loss: 0.2500"));
        assert!(card.contains("- Accuracy: 0.7500"));
        assert!(card.contains("| 1 | Sports | 1.0000 | 1.0000 | 1.0000 | 1 |"));
        assert!(card.contains("- learning_rate: 5e-5"));
        assert!(card.contains("- num_epochs: 2"));

        Ok(())
    }
}
