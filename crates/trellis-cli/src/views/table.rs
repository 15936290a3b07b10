use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use trellis_core::import::ImportStats;
use trellis_core::models::{Section, TaskList};

fn label(emoji: &str, name: &str) -> String {
    if emoji.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", emoji, name)
    }
}

pub fn display_lists(lists: &[TaskList]) {
    if lists.is_empty() {
        println!("No lists found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Name", "Created"]);
    for (index, list) in lists.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index));
        row.add_cell(Cell::new(list.id));
        row.add_cell(Cell::new(label(&list.emoji, &list.name)).add_attribute(Attribute::Bold));
        row.add_cell(Cell::new(list.created_at.humanize()));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_sections(sections: &[Section]) {
    if sections.is_empty() {
        println!("No sections found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Name"]);
    for (index, section) in sections.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index));
        row.add_cell(Cell::new(section.id));
        row.add_cell(Cell::new(label(&section.emoji, &section.name)));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_import_stats(stats: &ImportStats) {
    let mut table = Table::new();
    table.set_header(vec!["", "Count"]);
    let counters = [
        ("Lists created", stats.lists_created),
        ("Sections created", stats.sections_created),
        ("Tags created", stats.tags_created),
        ("Tasks created", stats.tasks_created),
        ("Tasks skipped", stats.tasks_skipped),
        ("Parents linked", stats.parents_linked),
    ];
    for (name, count) in counters {
        table.add_row(vec![Cell::new(name), Cell::new(count)]);
    }
    let errors = Cell::new(stats.errors);
    let errors = if stats.errors > 0 {
        errors.fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        errors
    };
    table.add_row(vec![Cell::new("Errors"), errors]);
    println!("{table}");

    for detail in &stats.error_details {
        println!("  - {}", detail);
    }
}
