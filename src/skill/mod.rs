//! Skill documents: parsing, discovery and creation.

pub mod blocks;
pub mod document;
pub mod frontmatter;
pub mod harvest;
pub mod lookup;

pub use blocks::{EXEC_MARKER, extract_executable_blocks, render_executable_block};
pub use document::{DocumentError, Grade, SkillDocument, load_document};
pub use frontmatter::{Frontmatter, FrontmatterValue, parse_frontmatter};
pub use harvest::{
    DocDefaults, NewSkill, harvest_plan, parse_markdown_doc, render_skill, save_harvested_deploy,
    write_skill,
};
pub use lookup::{SkillEntry, SkillLookup, find_skill, list_skills, search_skills};
