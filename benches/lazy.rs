use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use lazypb::bytes::Bytes;
use lazypb::encoding::{encode_key, encode_varint, fixed64, int64, string, uint32, WireType};
use lazypb::lazy::{Decoder, Def, MapPool};

/// A wide record: 40 scalar fields and a repeated nested message.
fn record() -> Bytes {
    let mut item = Vec::new();
    int64::encode(1, &-17, &mut item);
    string::encode(2, &"item name".to_string(), &mut item);
    fixed64::encode_packed(3, &[1, 2, 3, 4, 5, 6, 7, 8], &mut item);

    let mut buf = Vec::new();
    for tag in 1..=40u32 {
        match tag % 3 {
            0 => uint32::encode(tag, &(tag * 1000), &mut buf),
            1 => string::encode(tag, &format!("value of field {}", tag), &mut buf),
            _ => fixed64::encode(tag, &u64::from(tag), &mut buf),
        }
    }
    for _ in 0..16 {
        encode_key(50, WireType::LengthDelimited, &mut buf);
        encode_varint(item.len() as u64, &mut buf);
        buf.extend_from_slice(&item);
    }
    buf.into()
}

fn benchmark_lazy(criterion: &mut Criterion) {
    let buf = record();

    let mut narrow = Def::new([3, 7]);
    narrow.tags([40]);
    let wide = Def::new(1..=40);
    let mut nested = Def::new([1]);
    nested.nested_tag(50, [1, 2]);

    let mut group = criterion.benchmark_group("lazy");
    group.throughput(Throughput::Bytes(buf.len() as u64));

    for (name, def) in [("narrow", &narrow), ("wide", &wide), ("nested", &nested)] {
        let pooled = Decoder::new(Arc::new(MapPool::new()));
        group.bench_function(format!("{}/pooled", name), |b| {
            b.iter(|| {
                let result = pooled.decode(buf.clone(), def).unwrap();
                criterion::black_box(result.field_data(1).len());
            });
        });

        let unpooled = Decoder::new(Arc::new(MapPool::disabled()));
        group.bench_function(format!("{}/unpooled", name), |b| {
            b.iter(|| {
                let result = unpooled.decode(buf.clone(), def).unwrap();
                criterion::black_box(result.field_data(1).len());
            });
        });
    }

    let decoder = Decoder::default();
    group.bench_function("narrow/read", |b| {
        b.iter(|| {
            let result = decoder.decode(buf.clone(), &narrow).unwrap();
            let value = result.field_data(3).uint32_value().unwrap();
            let text = result.field_data(7).string_value().unwrap();
            criterion::black_box((value, text));
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_lazy);
criterion_main!(benches);
