use crate::schema::DataType;
use crate::selection::{CellPos, CellRange};
use crate::value::CellValue;

/// What the last copy captured. A new copy always replaces the whole value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CopyBuffer {
    #[default]
    Empty,
    Cell {
        value: CellValue,
        data_type: DataType,
        source: CellPos,
    },
    Range {
        /// Row-major value matrix
        values: Vec<Vec<CellValue>>,
        /// Data type of each source column
        types: Vec<DataType>,
        source: CellRange,
    },
}

impl CopyBuffer {
    pub fn is_empty(&self) -> bool {
        matches!(self, CopyBuffer::Empty)
    }

    /// (rows, cols) of the captured block
    pub fn shape(&self) -> (usize, usize) {
        match self {
            CopyBuffer::Empty => (0, 0),
            CopyBuffer::Cell { .. } => (1, 1),
            CopyBuffer::Range { values, .. } => (values.len(), values.first().map(|r| r.len()).unwrap_or(0)),
        }
    }

    pub fn matrix(&self) -> Vec<Vec<CellValue>> {
        match self {
            CopyBuffer::Empty => Vec::new(),
            CopyBuffer::Cell { value, .. } => vec![vec![value.clone()]],
            CopyBuffer::Range { values, .. } => values.clone(),
        }
    }

    /// Render as tab-separated text for the system clipboard
    pub fn to_tsv(&self) -> Result<String, String> {
        if self.is_empty() {
            return Err("Nothing to copy".to_string());
        }
        to_tsv(&self.matrix())
    }
}

/// Convert a value matrix to TSV
pub fn to_tsv(values: &[Vec<CellValue>]) -> Result<String, String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(Vec::new());
    for row in values {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| format!("Failed to write TSV: {}", e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| format!("Failed to write TSV: {}", e))?;
    let text = String::from_utf8(bytes).map_err(|_| "TSV is not valid UTF-8".to_string())?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Parse TSV (also handles single values) into a text matrix
pub fn parse_tsv(text: &str) -> Result<Vec<Vec<String>>, String> {
    let text = text.trim_end_matches(['\n', '\r']);
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Failed to parse TSV: {}", e))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

/// Copy text to system clipboard using platform-appropriate method
pub fn copy_to_system_clipboard(text: &str) -> Result<(), String> {
    // Try command-line tools first on Linux (more reliable with terminal apps)
    #[cfg(target_os = "linux")]
    {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let commands = [
            ("wl-copy", vec![]),
            ("xclip", vec!["-selection", "clipboard"]),
            ("xsel", vec!["--clipboard", "--input"]),
        ];

        for (cmd, args) in commands {
            if let Ok(mut child) = Command::new(cmd)
                .args(&args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                if let Some(mut stdin) = child.stdin.take() {
                    if stdin.write_all(text.as_bytes()).is_ok() {
                        drop(stdin);
                        if child.wait().map(|s| s.success()).unwrap_or(false) {
                            return Ok(());
                        }
                    }
                }
            }
        }

        Err("No clipboard tool found (install xclip or wl-copy)".to_string())
    }

    #[cfg(not(target_os = "linux"))]
    {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| format!("Clipboard error: {}", e))?;
        clipboard.set_text(text).map_err(|e| format!("Clipboard error: {}", e))?;
        Ok(())
    }
}

/// Paste text from system clipboard using platform-appropriate method
pub fn paste_from_system_clipboard() -> Result<String, String> {
    #[cfg(target_os = "linux")]
    {
        use std::process::Command;

        let commands = [
            ("wl-paste", vec!["--no-newline"]),
            ("xclip", vec!["-selection", "clipboard", "-o"]),
            ("xsel", vec!["--clipboard", "--output"]),
        ];

        for (cmd, args) in commands {
            if let Ok(output) = Command::new(cmd).args(&args).output() {
                if output.status.success() {
                    return String::from_utf8(output.stdout)
                        .map_err(|_| "Clipboard contains invalid UTF-8".to_string());
                }
            }
        }

        Err("No clipboard tool found (install xclip or wl-copy)".to_string())
    }

    #[cfg(not(target_os = "linux"))]
    {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| format!("Clipboard error: {}", e))?;
        clipboard.get_text().map_err(|e| format!("Clipboard error: {}", e))
    }
}
