use braincore::{
    CPU, CommandStream, Device, ErrorKind, ForwardLayer, KernelLibrary, LayerError,
    TransposeLayer,
    cpu::{CpuLibrary, HOST_EXECUTION_WIDTH, transpose_kernel},
};

fn batch_major(size: usize, batch_size: usize) -> Vec<f32> {
    (0..size * batch_size).map(|i| i as f32).collect()
}

fn element_major(input: &[f32], size: usize, batch_size: usize) -> Vec<f32> {
    let mut out = vec![0.; size * batch_size];
    for batch in 0..batch_size {
        for element in 0..size {
            out[element * batch_size + batch] = input[batch * size + element];
        }
    }
    out
}

#[test]
fn test_setup_with_transpose_kernel() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(8);
    assert!(!layer.is_ready());

    layer.setup_in_library(&device.default_library()?)?;
    assert!(layer.is_ready());
    Ok(())
}

#[test]
fn test_setup_without_transpose_kernel() {
    let mut layer = TransposeLayer::<CPU>::new(8);

    for _ in 0..2 {
        let err = layer.setup_in_library(&CpuLibrary::new()).unwrap_err();
        assert_eq!(err.kind(), Some(&LayerError::KernelNotFound));
        assert!(!layer.is_ready());
    }
}

#[test]
fn test_failed_setup_keeps_previous_pipeline() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(8);
    layer.setup_in_library(&device.default_library()?)?;

    assert!(layer.setup_in_library(&CpuLibrary::new()).is_err());
    assert!(layer.is_ready());
    Ok(())
}

#[test]
fn test_repeated_setup_replaces_pipeline() -> braincore::Result<()> {
    let device = CPU::new();
    let library = device.default_library()?;
    let mut layer = TransposeLayer::<CPU>::new(8);

    layer.setup_in_library(&library)?;
    let first = layer.pipeline().unwrap().clone();
    layer.setup_in_library(&library)?;

    assert!(!first.ptr_eq(layer.pipeline().unwrap()));
    Ok(())
}

#[test]
fn test_encode_before_setup() -> braincore::Result<()> {
    let device = CPU::new();
    let layer = TransposeLayer::<CPU>::new(2);
    let input = device.buffer_from_slice(&[1f32, 2., 3., 4.])?;
    let output = device.buffer_from_slice(&[0f32; 4])?;

    let mut stream = device.command_stream()?;
    let err = layer
        .encode_forward(&mut stream, 2, &input, 0, &output, 0)
        .unwrap_err();

    assert_eq!(err.kind(), Some(&LayerError::PipelineNotReady));
    assert!(stream.passes().is_empty());
    Ok(())
}

#[test]
fn test_transpose_batch_major_to_element_major() -> braincore::Result<()> {
    let device = CPU::new();
    let library = device.default_library()?;

    for (size, batch_size) in [(1, 1), (5, 1), (1, 6), (3, 4), (33, 3), (64, 17)] {
        let mut layer = TransposeLayer::<CPU>::new(size);
        layer.setup_in_library(&library)?;

        let data = batch_major(size, batch_size);
        let input = device.buffer_from_slice(&data)?;
        let output = device.buffer_from_slice(&vec![0f32; data.len()])?;

        let mut stream = device.command_stream()?;
        layer.encode_forward(&mut stream, batch_size, &input, 0, &output, 0)?;
        stream.commit()?;

        assert_eq!(
            device.read::<f32>(&output),
            element_major(&data, size, batch_size),
            "size={size} batch_size={batch_size}"
        );
    }
    Ok(())
}

#[test]
fn test_transpose_with_offsets() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(3);
    layer.setup_in_library(&device.default_library()?)?;

    // 2 padding elements in front of the input, 4 in front of the output
    let mut data = vec![-1f32, -1.];
    data.extend([1., 2., 3., 4., 5., 6.]);
    let input = device.buffer_from_slice(&data)?;
    let output = device.buffer_from_slice(&[-1f32; 10])?;

    let mut stream = device.command_stream()?;
    layer.encode_forward(&mut stream, 2, &input, 2, &output, 4)?;
    stream.commit()?;

    assert_eq!(
        device.read::<f32>(&output),
        [-1., -1., -1., -1., 1., 4., 2., 5., 3., 6.]
    );
    Ok(())
}

#[test]
fn test_outputs_concatenate_as_memory_blocks() -> braincore::Result<()> {
    let device = CPU::new();
    let library = device.default_library()?;
    let batch_size = 3;

    let mut first = TransposeLayer::<CPU>::new(2);
    let mut second = TransposeLayer::<CPU>::new(4);
    first.setup_in_library(&library)?;
    second.setup_in_library(&library)?;

    let first_data = batch_major(2, batch_size);
    let second_data = batch_major(4, batch_size)
        .into_iter()
        .map(|x| x + 100.)
        .collect::<Vec<_>>();
    let first_input = device.buffer_from_slice(&first_data)?;
    let second_input = device.buffer_from_slice(&second_data)?;
    let output = device.buffer_from_slice(&[0f32; 18])?;

    let mut stream = device.command_stream()?;
    first.encode_forward(&mut stream, batch_size, &first_input, 0, &output, 0)?;
    second.encode_forward(
        &mut stream,
        batch_size,
        &second_input,
        0,
        &output,
        first.output_size() * batch_size,
    )?;
    assert_eq!(stream.passes().len(), 2);
    stream.commit()?;

    let mut expected = element_major(&first_data, 2, batch_size);
    expected.extend(element_major(&second_data, 4, batch_size));
    assert_eq!(device.read::<f32>(&output), expected);
    Ok(())
}

#[test]
fn test_pipeline_reused_across_streams() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(2);
    layer.setup_in_library(&device.default_library()?)?;

    for batch_size in 1..4 {
        let data = batch_major(2, batch_size);
        let input = device.buffer_from_slice(&data)?;
        let output = device.buffer_from_slice(&vec![0f32; data.len()])?;

        let mut stream = device.command_stream()?;
        layer.encode_forward(&mut stream, batch_size, &input, 0, &output, 0)?;
        stream.commit()?;
        assert_eq!(
            device.read::<f32>(&output),
            element_major(&data, 2, batch_size)
        );
    }
    Ok(())
}

#[test]
fn test_undersized_output_fails_on_commit() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(4);
    layer.setup_in_library(&device.default_library()?)?;

    let input = device.buffer_from_slice(&batch_major(4, 2))?;
    let output = device.buffer_from_slice(&[0f32; 3])?;

    let mut stream = device.command_stream()?;
    layer.encode_forward(&mut stream, 2, &input, 0, &output, 0)?;

    let err = stream.commit().unwrap_err();
    assert_eq!(err.kind(), Some(&LayerError::OutOfBounds));
    Ok(())
}

#[test]
fn test_library_lists_kernel() -> braincore::Result<()> {
    let library = CPU::new().default_library()?;
    assert!(library.has_kernel(TransposeLayer::<CPU>::KERNEL_NAME));
    assert_eq!(library.kernel_names(), ["transpose"]);
    Ok(())
}

#[test]
fn test_element_size_mismatch() -> braincore::Result<()> {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::with_element_size(2, 2)?;

    let err = layer
        .setup_in_library(&device.default_library()?)
        .unwrap_err();
    assert_eq!(err.kind(), Some(&LayerError::ElementSizeMismatch));
    assert!(!layer.is_ready());

    let input = device.buffer_from_slice(&[1u16, 2, 3, 4])?;
    let output = device.buffer_from_slice(&[0u16; 4])?;
    let mut stream = device.command_stream()?;
    let err = layer
        .encode_forward(&mut stream, 2, &input, 0, &output, 0)
        .unwrap_err();
    assert_eq!(err.kind(), Some(&LayerError::PipelineNotReady));
    Ok(())
}

#[test]
fn test_transpose_u16_elements() -> braincore::Result<()> {
    let device = CPU::new();
    let mut library = CpuLibrary::new();
    library.register("transpose", HOST_EXECUTION_WIDTH, 2, transpose_kernel::<u16>);

    let mut layer = TransposeLayer::<CPU>::with_element_size(2, 2)?;
    layer.setup_in_library(&library)?;

    // one padding element in front of the input and the output
    let input = device.buffer_from_slice(&[9u16, 1, 2, 3, 4, 9, 9, 9])?;
    let output = device.buffer_from_slice(&[0u16; 5])?;

    let mut stream = device.command_stream()?;
    layer.encode_forward(&mut stream, 2, &input, 1, &output, 1)?;
    stream.commit()?;

    assert_eq!(device.read::<u16>(&output), [0, 1, 3, 2, 4]);
    Ok(())
}

#[test]
fn test_wide_kernel_rejected_by_f32_layer() {
    let mut library = CpuLibrary::new();
    library.register("transpose", HOST_EXECUTION_WIDTH, 8, transpose_kernel::<f64>);

    let mut layer = TransposeLayer::<CPU>::new(4);
    let err = layer.setup_in_library(&library).unwrap_err();
    assert_eq!(err.kind(), Some(&LayerError::ElementSizeMismatch));
}
