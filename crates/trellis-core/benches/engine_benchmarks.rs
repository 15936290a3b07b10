use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use trellis_core::db::establish_connection;
use trellis_core::models::{MoveTaskData, NewTaskData};
use trellis_core::position;
use trellis_core::recurrence::{compute_next_due_date, MonthDay, Recurrence};
use trellis_core::repository::{
    ExportRepository, ImportRepository, ListRepository, SectionRepository, SqliteRepository,
    TaskRepository,
};

async fn setup_test_repository() -> (SqliteRepository, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("bench.db");
    let pool = establish_connection(&db_path.to_string_lossy()).await.unwrap();
    (SqliteRepository::new(pool), temp_dir)
}

/// A section holding `roots` top-level tasks, each with a chain of `depth` subtasks.
async fn populate_section(repo: &SqliteRepository, roots: usize, depth: usize) -> (i64, Vec<i64>) {
    let list = repo
        .create_list("Bench".to_string(), String::new(), None)
        .await
        .unwrap();
    let section = repo
        .create_section(list.id, "Tasks".to_string(), String::new())
        .await
        .unwrap();

    let mut leaves = Vec::with_capacity(roots);
    for i in 0..roots {
        let mut parent = repo
            .add_task(NewTaskData {
                section_id: Some(section.id),
                title: format!("Task {}", i),
                tags: if i % 4 == 0 { vec![format!("tag{}", i % 3)] } else { vec![] },
                ..Default::default()
            })
            .await
            .unwrap();
        for level in 0..depth {
            parent = repo
                .add_task(NewTaskData {
                    parent_id: Some(parent.id),
                    title: format!("Task {}.{}", i, level),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        leaves.push(parent.id);
    }
    (section.id, leaves)
}

fn bench_next_due_date(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
    let overdue = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let rules = [
        ("daily", Recurrence::Daily),
        (
            "weekly",
            Recurrence::Weekly {
                days: [1, 4].into_iter().collect(),
            },
        ),
        ("monthly", Recurrence::Monthly { day_of_month: 31 }),
        ("yearly", Recurrence::Yearly { month: 2, day: 29 }),
        (
            "custom_dates",
            Recurrence::CustomDates {
                dates: ["03-15", "06-30", "12-24"]
                    .iter()
                    .map(|raw| raw.parse::<MonthDay>().unwrap())
                    .collect(),
            },
        ),
    ];

    let mut group = c.benchmark_group("next_due_date");
    for (name, rule) in &rules {
        group.bench_with_input(BenchmarkId::new("overdue", name), rule, |b, rule| {
            b.iter(|| black_box(compute_next_due_date(rule, Some(overdue), today)))
        });
    }
    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");
    for size in [10i64, 100, 1000] {
        let siblings: Vec<i64> = (1..=size).collect();
        group.bench_with_input(BenchmarkId::new("group_size", size), &siblings, |b, siblings| {
            b.iter(|| black_box(position::reorder(0, siblings, size / 2)))
        });
    }
    group.finish();
}

fn bench_section_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (repo, _temp_dir, section_id) = rt.block_on(async {
        let (repo, temp_dir) = setup_test_repository().await;
        let (section_id, _) = populate_section(&repo, 50, 3).await;
        (repo, temp_dir, section_id)
    });

    c.bench_function("section_tree_200_tasks", |b| {
        b.iter(|| rt.block_on(async { black_box(repo.find_section_tree(section_id).await.unwrap()) }))
    });
}

fn bench_nesting_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("nest_under_deep_chain");
    for depth in [10usize, 100] {
        let (repo, _temp_dir, root, leaf) = rt.block_on(async {
            let (repo, temp_dir) = setup_test_repository().await;
            let (section_id, leaves) = populate_section(&repo, 1, depth).await;
            let root = repo.find_section_tree(section_id).await.unwrap()[0].task.id;
            (repo, temp_dir, root, leaves[0])
        });

        // Rejected every time, so the tree never changes between iterations
        group.bench_with_input(BenchmarkId::new("depth", depth), &leaf, |b, leaf| {
            b.iter(|| {
                rt.block_on(async {
                    let result = repo
                        .move_task(
                            root,
                            MoveTaskData {
                                parent_id: Some(Some(*leaf)),
                                ..Default::default()
                            },
                        )
                        .await;
                    black_box(result.is_err())
                })
            })
        });
    }
    group.finish();
}

fn bench_reimport(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (repo, _temp_dir, json, csv) = rt.block_on(async {
        let (repo, temp_dir) = setup_test_repository().await;
        populate_section(&repo, 50, 2).await;
        let json = repo.export_json(None).await.unwrap();
        let csv = repo.export_csv(None).await.unwrap();
        (repo, temp_dir, json, csv)
    });

    let mut group = c.benchmark_group("reimport_150_tasks");
    group.bench_function("json", |b| {
        b.iter(|| rt.block_on(async { black_box(repo.import_file("export.json", json.as_bytes()).await.unwrap()) }))
    });
    group.bench_function("csv", |b| {
        b.iter(|| rt.block_on(async { black_box(repo.import_file("export.csv", csv.as_bytes()).await.unwrap()) }))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_next_due_date,
    bench_reorder,
    bench_section_tree,
    bench_nesting_check,
    bench_reimport
);
criterion_main!(benches);
