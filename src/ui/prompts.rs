//! ui::prompts
//!
//! Tag message acquisition: literal text, a file, or an editor session.
//!
//! # Design
//!
//! The orchestrator asks a [`MessageSource`] for the message body and never
//! cares where it came from. Only editor sessions are post-processed:
//! lines starting with `#` are dropped, mirroring `git tag`.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

/// Errors from message acquisition.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read message file '{path}': {message}")]
    ReadFile { path: PathBuf, message: String },

    #[error("editor '{editor}' failed: {message}")]
    EditorFailed { editor: String, message: String },

    #[error("IO error: {0}")]
    IoError(String),
}

/// Where a tag message comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSource {
    /// Message given on the command line.
    Literal(String),
    /// Message read from a file (`-` reads stdin).
    File(PathBuf),
    /// Message written interactively in an editor command.
    Editor(String),
}

impl MessageSource {
    /// Obtain the message.
    ///
    /// `previous` pre-fills the editor buffer (the cleaned message of a tag
    /// being replaced); it is ignored by the other sources. `tag` is named in
    /// the editor's help text.
    pub fn obtain(&self, tag: &str, previous: Option<&str>) -> Result<String, PromptError> {
        match self {
            MessageSource::Literal(text) => Ok(text.clone()),
            MessageSource::File(path) => read_message_file(path),
            MessageSource::Editor(editor) => {
                let edited = edit(editor, &editor_template(tag, previous))?;
                Ok(strip_comments(&edited))
            }
        }
    }
}

fn read_message_file(path: &PathBuf) -> Result<String, PromptError> {
    let read_err = |e: std::io::Error| PromptError::ReadFile {
        path: path.clone(),
        message: e.to_string(),
    };

    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(read_err)?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(read_err)
}

/// Choose the editor command the way git does.
///
/// `$GIT_EDITOR`, then `core.editor`, then `$VISUAL`, then `$EDITOR`,
/// falling back to `vi`.
pub fn resolve_editor(core_editor: Option<String>) -> String {
    std::env::var("GIT_EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .or(core_editor.filter(|e| !e.trim().is_empty()))
        .or_else(|| std::env::var("VISUAL").ok().filter(|e| !e.trim().is_empty()))
        .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| "vi".to_string())
}

fn editor_template(tag: &str, previous: Option<&str>) -> String {
    let mut text = previous.unwrap_or_default().trim_end().to_string();
    text.push_str(&format!(
        "\n\n#\n\
         # Write a message for tag:\n\
         #   {tag}\n\
         # Lines starting with '#' will be ignored.\n\
         # The EVTag checksum line is appended automatically.\n"
    ));
    text
}

/// Run `editor` on a scratch file holding `initial` and return the result.
///
/// The editor string goes through the shell so values like
/// `code --wait` work as they do for git.
pub fn edit(editor: &str, initial: &str) -> Result<String, PromptError> {
    let file = tempfile::Builder::new()
        .prefix("EVTAG_EDITMSG")
        .tempfile()
        .map_err(|e| PromptError::IoError(e.to_string()))?;
    fs::write(file.path(), initial).map_err(|e| PromptError::IoError(e.to_string()))?;

    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} \"$@\""))
        .arg(editor)
        .arg(file.path())
        .status()
        .map_err(|e| PromptError::EditorFailed {
            editor: editor.to_string(),
            message: e.to_string(),
        })?;

    if !status.success() {
        return Err(PromptError::EditorFailed {
            editor: editor.to_string(),
            message: format!("exited with {status}"),
        });
    }

    fs::read_to_string(file.path()).map_err(|e| PromptError::IoError(e.to_string()))
}

/// Drop `#` comment lines and surrounding blank lines.
pub fn strip_comments(text: &str) -> String {
    let kept: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
    let joined = kept.join("\n");
    let trimmed = joined.trim_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
