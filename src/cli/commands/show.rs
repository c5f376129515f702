//! jaavis show - Show a skill's metadata and executable blocks

use clap::Args;
use colored::Colorize;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{JaavisError, Result};
use crate::skill::{SkillDocument, find_skill, load_document};

const DESCRIPTION_WIDTH: usize = 76;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Skill file name or part of it
    pub name: String,

    /// Print the raw file instead of a summary
    #[arg(long)]
    pub raw: bool,
}

pub fn run(ctx: &AppContext, args: &ShowArgs) -> Result<()> {
    let library = ctx.library_path()?;
    let lookup = find_skill(&library, &args.name);
    let path = lookup
        .path()
        .ok_or_else(|| JaavisError::NotFound(format!("skill '{}'", args.name)))?
        .to_path_buf();
    debug!(path = %path.display(), "showing skill");

    if args.raw {
        print!("{}", std::fs::read_to_string(&path)?);
        return Ok(());
    }

    let document = load_document(&path)?;
    if ctx.robot_mode {
        return emit_robot(&robot_ok(&document));
    }
    emit_human(layout(&document));
    Ok(())
}

fn layout(document: &SkillDocument) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&document.title);
    layout.kv("Path", &document.path.display().to_string());
    layout.kv("Domain", &document.domain);
    if let Some(grade) = document.grade {
        layout.kv("Grade", &format!("{grade} ({})", grade.codename()));
    }
    if !document.tags.is_empty() {
        let tags: Vec<&str> = document.tags.iter().map(String::as_str).collect();
        layout.kv("Tags", &tags.join(", "));
    }
    if !document.description.is_empty() {
        layout.blank();
        for line in textwrap::wrap(&document.description, DESCRIPTION_WIDTH) {
            layout.push_line(line.into_owned());
        }
    }

    if !document.pros.is_empty() {
        layout.blank().section("Pros");
        for pro in &document.pros {
            layout.bullet(pro);
        }
    }
    if !document.cons.is_empty() {
        layout.blank().section("Cons");
        for con in &document.cons {
            layout.bullet(con);
        }
    }

    layout.blank();
    if document.executable_blocks.is_empty() {
        layout.push_line("Not executable (no exec blocks)".dimmed().to_string());
    } else {
        layout.section(&format!(
            "Executable blocks ({})",
            document.executable_blocks.len()
        ));
        for (index, block) in document.executable_blocks.iter().enumerate() {
            layout.push_line(format!("[{}]", index + 1));
            for line in block.lines() {
                layout.push_line(format!("  {}", line.green()));
            }
        }
    }
    layout
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn layout_lists_blocks_and_grade() {
        console::set_colors_enabled(false);
        colored::control::set_override(false);
        let content = "---\nname: Next App\ndomain: frontend\ngrade: A\npros:\n  - fast\n---\n# Next\n\n<!-- JAAVIS:EXEC -->\n```bash\nnpx create-next-app\n```\n";
        let document = SkillDocument::from_content(Path::new("skills/frontend/next.md"), content);
        let text = layout(&document).build();
        assert!(text.starts_with("Next App"));
        assert!(text.contains("Grade"));
        assert!(text.contains("- fast"));
        assert!(text.contains("Executable blocks (1)"));
        assert!(text.contains("  npx create-next-app"));
    }

    #[test]
    fn layout_marks_plain_documents() {
        let document = SkillDocument::from_content(Path::new("notes.md"), "# Notes\n");
        assert!(layout(&document).build().contains("Not executable"));
    }
}
