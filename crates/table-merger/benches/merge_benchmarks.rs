//! Profiling and row-application benchmarks.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use table_merger::{ColumnInfo, ColumnProfiler, DataTable, Parser, TableMergeOperation};

/// Generate an insurance-style incoming table with the given number of rows.
fn generate_csv_data(rows: usize) -> String {
    let mut data = String::from("Date_of_Policy,FullName,Insurance_Plan,Policy_No,Monthly_Premium\n");
    let plans = ["gold plan", "silver plan", "bronze plan"];
    for row in 0..rows {
        data.push_str(&format!(
            "{:02}/{:02}/2023,person {},{},AB-{:05},{:.2}\n",
            (row % 12) + 1,
            (row % 28) + 1,
            row,
            plans[row % plans.len()],
            row % 100_000,
            (row % 500) as f64 * 1.5
        ));
    }
    data
}

fn template() -> Arc<[ColumnInfo]> {
    let table = Parser::new()
        .parse_str(
            "Date,EmployeeName,Plan,PolicyNumber,Premium\n\
             01-05-2023,John Doe,Gold Plan,AB-12345,150.00\n\
             15-05-2023,Jane Smith,Silver Plan,CD-67890,100.00\n",
        )
        .unwrap();
    ColumnProfiler::new().profile(&table).unwrap().into()
}

fn confirmed_operation(table: DataTable) -> TableMergeOperation {
    let mut op = TableMergeOperation::new(template(), table);
    op.profile(&ColumnProfiler::new()).unwrap();
    op.confirm_mapping([
        ("Date", "Date_of_Policy"),
        ("EmployeeName", "FullName"),
        ("Plan", "Insurance_Plan"),
        ("PolicyNumber", "Policy_No"),
        ("Premium", "Monthly_Premium"),
    ])
    .unwrap();
    op.confirm_transformations([
        ("Date", r#"reformat_date(value, "%m/%d/%Y", "%d-%m-%Y")"#),
        ("EmployeeName", "title_case(value)"),
        ("Plan", "title_case(value)"),
        ("PolicyNumber", "value"),
        ("Premium", "format_number(value, 2)"),
    ])
    .unwrap();
    op
}

/// Benchmark column profiling across table sizes.
fn bench_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile");
    let profiler = ColumnProfiler::new();

    for rows in [100, 1_000, 10_000].iter() {
        let table = Parser::new().parse_str(&generate_csv_data(*rows)).unwrap();
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &table, |b, table| {
            b.iter(|| profiler.profile(black_box(table)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark applying confirmed transformations to every row.
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for rows in [100, 1_000, 10_000].iter() {
        let table = Parser::new().parse_str(&generate_csv_data(*rows)).unwrap();
        let mut op = confirmed_operation(table);
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_function(BenchmarkId::new("rows", rows), |b| {
            b.iter(|| {
                let merged = op.apply().unwrap().filter(|r| r.is_ok()).count();
                black_box(merged)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_profile, bench_apply);
criterion_main!(benches);
