use braincore::{CPU, CommandStream, Device, ForwardLayer, TransposeLayer};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const BATCH_SIZE: usize = 32;

pub fn bench_encode(c: &mut Criterion) {
    let device = CPU::new();
    let mut layer = TransposeLayer::<CPU>::new(1024);
    layer
        .setup_in_library(&device.default_library().unwrap())
        .unwrap();

    let input = device.buffer_from_slice(&vec![1f32; 1024 * BATCH_SIZE]).unwrap();
    let output = device.buffer_from_slice(&vec![0f32; 1024 * BATCH_SIZE]).unwrap();

    c.bench_function("encode transpose", |bench| {
        bench.iter(|| {
            let mut stream = device.command_stream().unwrap();
            layer
                .encode_forward(&mut stream, BATCH_SIZE, &input, 0, &output, 0)
                .unwrap();
            stream
        })
    });
}

pub fn bench_transpose(c: &mut Criterion) {
    let device = CPU::new();
    let library = device.default_library().unwrap();

    let mut group = c.benchmark_group("transpose");
    for size in [64, 512, 4096] {
        let mut layer = TransposeLayer::<CPU>::new(size);
        layer.setup_in_library(&library).unwrap();

        let input = device.buffer_from_slice(&vec![1f32; size * BATCH_SIZE]).unwrap();
        let output = device.buffer_from_slice(&vec![0f32; size * BATCH_SIZE]).unwrap();

        group.throughput(Throughput::Elements((size * BATCH_SIZE) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| {
                let mut stream = device.command_stream().unwrap();
                layer
                    .encode_forward(&mut stream, BATCH_SIZE, &input, 0, &output, 0)
                    .unwrap();
                stream.commit().unwrap();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_transpose);
criterion_main!(benches);
