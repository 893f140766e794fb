use burn::{
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Spatial size `[height, width]` of an NCHW tensor.
pub fn spatial_size<B: Backend>(x: &Tensor<B, 4>) -> [usize; 2] {
    let [_, _, h, w] = x.dims();
    [h, w]
}

/// Nearest-neighbour resize of an NCHW tensor to `size`.
pub fn upsample_to<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    if spatial_size(&x) == size {
        return x;
    }
    interpolate(x, size, InterpolateOptions::new(InterpolateMode::Nearest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::TensorData};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_repeats_pixels() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::from_floats([[[[1.0, 2.0], [3.0, 4.0]]]], &device);

        let up = upsample_to(x, [4, 4]);

        up.into_data().assert_eq(
            &TensorData::from([[[
                [1.0f32, 1.0, 2.0, 2.0],
                [1.0, 1.0, 2.0, 2.0],
                [3.0, 3.0, 4.0, 4.0],
                [3.0, 3.0, 4.0, 4.0],
            ]]]),
            false,
        );
    }

    #[test]
    fn test_broadcasts_global_vector() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([2, 5, 1, 1], &device);

        let up = upsample_to(x, [4, 6]);
        assert_eq!(up.dims(), [2, 5, 4, 6]);
        assert_eq!(up.sum().into_scalar(), 240.0);
    }
}
