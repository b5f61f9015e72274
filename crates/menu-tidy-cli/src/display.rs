use colored::*;
use menu_tidy_core::model::LayoutDiff;
use menu_tidy_core::{Action, ConfigModel, ItemMetadata, Plan};

/// Print the layout as an indented tree, one folder per block.
pub fn print_layout(model: &ConfigModel, details: bool) {
    for (folder, items) in model.folders() {
        let indent = "  ".repeat(folder.depth());
        let label = if folder.is_root() {
            folder.to_string()
        } else {
            folder.segments().last().cloned().unwrap_or_default()
        };
        println!("{}{}", indent, format!("{}\\", label).blue().bold());
        for (name, metadata) in items {
            println!("{}  {}", indent, name);
            if details {
                print_metadata(&format!("{}    ", indent), metadata);
            }
        }
    }
    println!();
    println!(
        "{} folders, {} items",
        model.folder_count().to_string().cyan(),
        model.item_count().to_string().cyan()
    );
}

fn print_metadata(indent: &str, metadata: &ItemMetadata) {
    let fields = [
        ("Target", &metadata.target_path),
        ("Arguments", &metadata.arguments),
        ("Working dir", &metadata.working_directory),
        ("Icon", &metadata.icon_location),
        ("Description", &metadata.description),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}{}: {}", indent, label.dimmed(), value);
        }
    }
}

fn action_line(action: &Action) -> ColoredString {
    let text = action.to_string();
    match action {
        Action::Move { .. } => text.cyan(),
        Action::Recreate { .. } => text.green(),
        Action::Quarantine { .. } => text.yellow(),
        Action::DeleteDuplicate { .. } | Action::DeleteEmptyFolder { .. } => text.red(),
    }
}

/// Preview of a plan: every action in execution order, then the notes.
pub fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "Nothing to do: the tree matches the layout.".green());
    } else {
        println!("{} planned actions:", plan.len().to_string().bold());
        for action in plan.actions() {
            println!("  {}", action_line(action));
        }
    }

    if !plan.notes.is_empty() {
        println!();
        println!("{}", "Notes:".bold());
        for note in &plan.notes {
            println!("  {}", note.to_string().dimmed());
        }
    }
}

pub fn print_diff(diff: &LayoutDiff) {
    if diff.is_empty() {
        println!("{}", "No differences.".green());
        return;
    }
    for folder in &diff.added_folders {
        println!("  {} {}\\", "+".green(), folder);
    }
    for folder in &diff.removed_folders {
        println!("  {} {}\\", "-".red(), folder);
    }
    for (folder, name) in &diff.added_items {
        println!("  {} {}\\{}", "+".green(), folder, name);
    }
    for (folder, name) in &diff.removed_items {
        println!("  {} {}\\{}", "-".red(), folder, name);
    }
    for (name, from, to) in &diff.moved_items {
        println!("  {} {}: {} -> {}", "~".cyan(), name, from, to);
    }
    println!("{} changes", diff.change_count().to_string().bold());
}
