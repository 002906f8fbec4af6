//! Headless adapter: a project directory holding `index.html`, `styles.css`,
//! and `script.js` stands in for the three editor buffers.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use webide_assist::{AssistError, BufferId, EditorBuffers, InMemoryBuffers};

#[derive(Debug, Clone)]
pub struct ProjectDir {
    root: PathBuf,
}

impl ProjectDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, buffer: BufferId) -> PathBuf {
        self.root.join(buffer.file_name())
    }

    /// Reads all three files. A missing file is an empty buffer.
    pub fn load(&self) -> io::Result<InMemoryBuffers> {
        let buffers = InMemoryBuffers::new();
        for buffer in BufferId::ALL {
            let text = match fs::read_to_string(self.path_for(buffer)) {
                Ok(text) => text,
                Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
                Err(error) => return Err(error),
            };
            buffers.replace_all(buffer, &text);
        }
        Ok(buffers)
    }

    /// Writes back only the listed buffers.
    pub fn save(&self, buffers: &dyn EditorBuffers, modified: &BTreeSet<BufferId>) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        for buffer in modified {
            fs::write(self.path_for(*buffer), buffers.read_all(*buffer))?;
        }
        Ok(())
    }

    /// Writes an enhanced buffer back unless the request was refused before
    /// any output could land in it. Returns whether the file was written.
    pub fn save_enhanced<T>(
        &self,
        buffers: &dyn EditorBuffers,
        buffer: BufferId,
        result: &Result<T, AssistError>,
    ) -> io::Result<bool> {
        let touched = match result {
            Ok(_) => true,
            Err(error) => error.reached_transport(),
        };
        if touched {
            self.save(buffers, &BTreeSet::from([buffer]))?;
        }
        Ok(touched)
    }
}
