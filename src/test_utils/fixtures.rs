use std::path::PathBuf;

use tempfile::TempDir;

/// Test fixture providing an isolated library/project directory.
pub struct UnitTestFixture {
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
}

impl Default for UnitTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitTestFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().to_path_buf();

        println!("[FIXTURE] Created temp directory: {data_path:?}");

        Self {
            temp_dir,
            data_path,
        }
    }

    /// Create a file with content, creating parent directories as needed.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.data_path.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        println!(
            "[FIXTURE] Created file: {:?} ({} bytes)",
            full_path,
            content.len()
        );
        full_path
    }

    /// Create a skill at `skills/<domain>/<name>.md`.
    #[must_use]
    pub fn create_skill(&self, domain: &str, name: &str, content: &str) -> PathBuf {
        self.create_file(&format!("skills/{domain}/{name}.md"), content)
    }

    /// Create a skill with a single executable block.
    #[must_use]
    pub fn create_executable_skill(&self, domain: &str, name: &str, script: &str) -> PathBuf {
        let content = format!(
            "---\nname: {name}\ndomain: {domain}\n---\n# {name}\n\n{}",
            crate::skill::render_executable_block(script)
        );
        self.create_skill(domain, name, &content)
    }

    /// Path inside the fixture without creating anything.
    #[must_use]
    pub fn path(&self, relative_path: &str) -> PathBuf {
        self.data_path.join(relative_path)
    }
}

impl Drop for UnitTestFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Cleaning up temp directory: {:?}", self.data_path);
    }
}
