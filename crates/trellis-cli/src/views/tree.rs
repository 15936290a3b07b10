use chrono::Local;
use chrono_humanize::Humanize;
use owo_colors::{OwoColorize, Style};
use trellis_core::models::{Section, Task, TaskNode, TaskPriority};

/// One printable row of a section tree.
#[derive(Debug, Clone)]
pub struct TreeLine {
    pub depth: usize,
    pub task: Task,
    pub tags: Vec<String>,
}

/// Flattens a section tree depth-first, in sibling order. With `open_only`,
/// completed tasks are dropped along with their subtrees.
pub fn flatten_tree(nodes: &[TaskNode], open_only: bool) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    push_nodes(nodes, 0, open_only, &mut lines);
    lines
}

fn push_nodes(nodes: &[TaskNode], depth: usize, open_only: bool, lines: &mut Vec<TreeLine>) {
    for node in nodes {
        if open_only && node.task.is_completed {
            continue;
        }
        lines.push(TreeLine {
            depth,
            task: node.task.clone(),
            tags: node.tags.clone(),
        });
        push_nodes(&node.children, depth + 1, open_only, lines);
    }
}

pub fn display_section_tree(section: &Section, nodes: &[TaskNode], open_only: bool) {
    let header = if section.emoji.is_empty() {
        section.name.clone()
    } else {
        format!("{} {}", section.emoji, section.name)
    };
    println!("{} {}", header.bold().underline(), format!("#{}", section.id).bright_black());

    let lines = flatten_tree(nodes, open_only);
    if lines.is_empty() {
        println!("  {}", "No tasks.".bright_black());
        return;
    }
    for line in &lines {
        println!("{}", render_line(line));
    }
    println!();
}

fn render_line(line: &TreeLine) -> String {
    let task = &line.task;
    let indent = "  ".repeat(line.depth + 1);
    let marker = if task.is_completed { "[x]" } else { "[ ]" };

    let title_style = if task.is_completed {
        Style::new().bright_black().strikethrough()
    } else {
        match task.priority {
            TaskPriority::High => Style::new().red().bold(),
            TaskPriority::Medium => Style::new().yellow(),
            TaskPriority::Low => Style::new().green(),
            TaskPriority::None => Style::new(),
        }
    };

    let mut out = format!(
        "{}{} {} {}",
        indent,
        marker,
        format!("{:>4}", task.id).bright_black(),
        task.title.style(title_style)
    );
    if task.is_pinned {
        out.push_str(" 📌");
    }
    if task.recurrence.is_recurring() {
        out.push_str(&format!(" {}", format!("↻ {}", task.recurrence).blue()));
    }
    if let Some(due) = task.due_date {
        let mut due_text = due.to_string();
        if let Some(time) = task.due_time {
            due_text.push_str(&format!(" {}", time.format("%H:%M")));
        }
        let overdue = !task.is_completed && due < Local::now().date_naive();
        if overdue {
            out.push_str(&format!(" {}", format!("due {}", due_text).red()));
        } else {
            out.push_str(&format!(" {}", format!("due {}", due_text).cyan()));
        }
    }
    if !line.tags.is_empty() {
        let tags: Vec<String> = line.tags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str(&format!(" {}", tags.join(" ").magenta()));
    }
    if let Some(completed_at) = task.completed_at.filter(|_| task.is_completed) {
        out.push_str(&format!(" {}", format!("done {}", completed_at.humanize()).bright_black()));
    }
    out
}
