use criterion::{criterion_group, criterion_main, Criterion};
use mgr::Mgr;

fn fibonacci() {
    let src = r#"
        fun fib(n) {
            if (n < 2) return n
            return fib(n - 2) + fib(n - 1)
        }

        fib(20)
    "#;

    let mut mgr = Mgr::new();
    mgr.run(src).unwrap();
}

fn zoo() {
    let src = r#"
        class Zoo {
            init() {
                this.aardvark = 1
                this.baboon   = 1
                this.cat      = 1
                this.donkey   = 1
            }
            ant()    { return this.aardvark }
            banana() { return this.baboon }
            tuna()   { return this.cat }
            hay      { return this.donkey }
        }

        var zoo = Zoo()
        var sum = 0
        while (sum < 10000) {
            sum = sum + zoo.ant() + zoo.banana() + zoo.tuna() + zoo.hay
        }
    "#;

    let mut mgr = Mgr::new();
    mgr.run(src).unwrap();
}

fn strings() {
    let src = r#"
        var text = ""
        for (var i = 0; i < 500; i = i + 1) {
            text = text + i ?: "never"
        }
        reverse(text)
    "#;

    let mut mgr = Mgr::new();
    mgr.run(src).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("my-benchmark");
    group.sample_size(20);
    group.bench_function("fib 20", |b| b.iter(fibonacci));
    group.bench_function("zoo", |b| b.iter(zoo));
    group.bench_function("strings", |b| b.iter(strings));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
