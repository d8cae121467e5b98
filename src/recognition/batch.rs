use crate::image::{NormalizedTensor, ResultFormatter};
use crate::recognition::pipeline::DigitRecognizer;
use crate::utils::error::ErrorStage;
use crate::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// 按 digit1.png, digit2.png, ... 顺序扫描目录，遇到第一个缺失编号即停止
pub struct BatchScanner {
    dir: PathBuf,
    dump_dir: Option<PathBuf>,
}

/// 单张图像的处理结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Predicted {
        digit: usize,
        confidence: f32,
        probabilities: Vec<f32>,
    },
    Skipped {
        stage: ErrorStage,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub index: usize,
    pub file_name: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub directory: String,
    pub entries: Vec<BatchEntry>,
}

impl BatchScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dump_dir: None,
        }
    }

    /// 把每张预处理后的28x28图像写入该目录
    pub fn with_dump_dir(mut self, dump_dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dump_dir.into());
        self
    }

    pub fn file_name(index: usize) -> String {
        format!("digit{}.png", index)
    }

    /// 依次列出存在的图像
    pub fn discover(&self) -> Vec<(usize, PathBuf)> {
        (1..)
            .map(|index| (index, self.dir.join(Self::file_name(index))))
            .take_while(|(_, path)| path.is_file())
            .collect()
    }

    /// 逐张处理，可恢复的错误记录后继续，推理错误直接终止
    ///
    /// 预处理图像写出失败只记录警告。
    pub fn run(&self, recognizer: &DigitRecognizer) -> Result<BatchReport> {
        let images = self.discover();
        if images.is_empty() {
            tracing::warn!("No digit images found in {}", self.dir.display());
        } else {
            tracing::info!(
                "Processing {} image(s) from {}",
                images.len(),
                self.dir.display()
            );
        }

        let mut entries = Vec::with_capacity(images.len());
        for (index, path) in images {
            let file_name = Self::file_name(index);
            let outcome = match recognizer.recognize_path(&path) {
                Ok(recognition) => {
                    let prediction = recognition.prediction;
                    tracing::info!(
                        "{}: {}",
                        file_name,
                        ResultFormatter::format_summary(&prediction)
                    );
                    if let Some(dump_dir) = &self.dump_dir {
                        if let Err(e) = Self::dump(dump_dir, index, &recognition.tensor) {
                            tracing::warn!("Could not dump preprocessed {}: {}", file_name, e);
                        }
                    }
                    BatchOutcome::Predicted {
                        digit: prediction.digit,
                        confidence: prediction.confidence_percent(),
                        probabilities: prediction.probabilities_percent(),
                    }
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping {}: {}", file_name, e);
                    BatchOutcome::Skipped {
                        stage: e.stage(),
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!("Aborting batch at {}: {}", file_name, e);
                    return Err(e);
                }
            };

            entries.push(BatchEntry {
                index,
                file_name,
                outcome,
            });
        }

        Ok(BatchReport {
            directory: self.dir.display().to_string(),
            entries,
        })
    }

    fn dump(dump_dir: &Path, index: usize, tensor: &NormalizedTensor) -> Result<()> {
        let path = dump_dir.join(format!("digit{}_preprocessed.png", index));
        ResultFormatter::save_tensor_png(tensor, &path)?;
        tracing::debug!("Wrote preprocessed image to {}", path.display());
        Ok(())
    }
}

impl BatchReport {
    pub fn predicted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, BatchOutcome::Predicted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.predicted_count()
    }

    /// 纯文本输出
    pub fn to_text(&self) -> String {
        if self.entries.is_empty() {
            return format!("No digit images found in {}", self.directory);
        }

        let mut out = String::new();
        for entry in &self.entries {
            let _ = match &entry.outcome {
                BatchOutcome::Predicted {
                    digit, confidence, ..
                } => writeln!(
                    out,
                    "{}: predicted {} ({:.1}% confidence)",
                    entry.file_name, digit, confidence
                ),
                BatchOutcome::Skipped { reason, .. } => {
                    writeln!(out, "Skipping {}: {}", entry.file_name, reason)
                }
            };
        }
        let _ = write!(
            out,
            "{} predicted, {} skipped",
            self.predicted_count(),
            self.skipped_count()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_stops_at_the_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["digit1.png", "digit2.png", "digit4.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = BatchScanner::new(dir.path()).discover();
        let indices: Vec<usize> = found.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn empty_directory_discovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BatchScanner::new(dir.path()).discover().is_empty());
    }

    #[test]
    fn directories_named_like_images_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("digit1.png")).unwrap();
        assert!(BatchScanner::new(dir.path()).discover().is_empty());
    }

    #[test]
    fn empty_report_text_says_so() {
        let report = BatchReport {
            directory: "digits".to_string(),
            entries: Vec::new(),
        };
        assert_eq!(report.to_text(), "No digit images found in digits");
    }
}
