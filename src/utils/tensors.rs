use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Build a 1D tensor of class ids, typically the targets for a batch
pub fn class_ids<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::from_data(
        Data::new(
            ids.iter().map(|&id| (id as i64).elem()).collect(),
            Shape::new([ids.len()]),
        ),
        device,
    )
}

/// Read a 1D tensor of class ids back into a list
pub fn to_class_ids<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<usize> {
    tensor
        .into_data()
        .convert::<i64>()
        .value
        .into_iter()
        .map(|id| id as usize)
        .collect()
}

/// Select the highest-scoring class for each row of a [batch_size, n_classes] tensor
pub fn argmax_classes<B: Backend>(scores: Tensor<B, 2>) -> Vec<usize> {
    let [batch_size, _n_classes] = scores.dims();

    to_class_ids(scores.argmax(1).reshape([batch_size]))
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn test_argmax_classes() {
        let device = NdArrayDevice::Cpu;
        let scores = Tensor::<TestBackend, 2>::from_floats(
            [
                [0.1, 2.5, -1.0, 0.3],
                [4.0, 1.0, 1.0, 1.0],
                [0.0, 0.0, 0.2, 0.9],
            ],
            &device,
        );

        assert_eq!(argmax_classes(scores), vec![1, 0, 3]);
    }

    #[test]
    fn test_class_ids_round_trip() {
        let device = NdArrayDevice::Cpu;
        let tensor = class_ids::<TestBackend>(&[3, 0, 2, 1], &device);

        assert_eq!(tensor.dims(), [4]);
        assert_eq!(to_class_ids(tensor), vec![3, 0, 2, 1]);
    }
}
