//! Content sniffing by magic bytes.

use shelfwise_core::Classification;

/// Map a MIME type onto the built-in category table.
///
/// Returns `None` when the type carries no useful signal, so the caller can
/// fall back to the extension table.
pub fn mime_classification(mime: &str) -> Option<Classification> {
    let mime = mime.to_ascii_lowercase();
    let (major, minor) = mime.split_once('/')?;

    let (category, subcategory) = match major {
        "image" => match minor {
            "svg+xml" | "x-eps" => ("Pics", "Vector"),
            "x-canon-cr2" | "x-nikon-nef" | "x-adobe-dng" => ("Pics", "Raw"),
            "x-icon" | "vnd.microsoft.icon" => ("Pics", "Icons"),
            _ => ("Pics", "Photos"),
        },
        "audio" => match minor {
            "x-m4b" => ("Audio", "Podcasts"),
            _ => ("Audio", "Music"),
        },
        "video" => match minor {
            "3gpp" | "x-m4v" => ("Vids", "Clips"),
            _ => ("Vids", "Movies"),
        },
        "application" => match minor {
            "pdf" => ("Docs", "PDFs"),
            "msword" | "vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                ("Docs", "Word")
            }
            "vnd.ms-excel"
            | "vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "vnd.oasis.opendocument.spreadsheet" => ("Docs", "Sheets"),
            "vnd.ms-powerpoint" | "vnd.openxmlformats-officedocument.presentationml.presentation" => {
                ("Docs", "Presentations")
            }
            "epub+zip" => ("Docs", "Ebooks"),
            "zip" | "x-rar" | "vnd.rar" | "x-rar-compressed" | "x-7z-compressed" | "gzip"
            | "x-bzip2" | "x-xz" | "x-tar" => ("Archives", "Compressed"),
            "x-iso9660-image" | "x-apple-diskimage" => ("Archives", "Disk"),
            "x-msdownload" | "x-dosexec" | "x-msi" | "vnd.microsoft.portable-executable" => {
                ("Programs", "Windows")
            }
            "x-debian-package" | "vnd.debian.binary-package" | "x-rpm" | "x-executable"
            | "x-sharedlib" => ("Programs", "Linux"),
            "vnd.android.package-archive" => ("Programs", "Android"),
            "x-sqlite3" | "vnd.sqlite3" => ("Apps", "Database"),
            "json" | "xml" | "yaml" => ("Web", "Data"),
            "wasm" => ("Code", "Web"),
            _ => return None,
        },
        "font" => ("System", "Fonts"),
        "text" => match minor {
            "html" | "xml" => ("Web", "Documents"),
            "x-python" | "x-script.python" => ("Code", "Python"),
            "x-shellscript" | "x-sh" => ("Code", "Shell"),
            "x-c" | "x-c++" => ("Code", "C"),
            "x-java-source" | "x-java" => ("Code", "Java"),
            _ => ("Docs", "Text"),
        },
        _ => return None,
    };

    Some(Classification::new(category, subcategory))
}

#[cfg(feature = "sniff")]
mod sniffer {
    use shelfwise_core::{Classification, FileInfo};
    use tracing::debug;

    use super::mime_classification;
    use crate::classify::PreClassifier;

    /// Classifies by the file's leading bytes using `infer`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MimeSniffer;

    impl PreClassifier for MimeSniffer {
        fn name(&self) -> &'static str {
            "mime"
        }

        fn try_classify(&self, file: &FileInfo) -> Option<Classification> {
            let kind = match infer::get_from_path(&file.path) {
                Ok(Some(kind)) => kind,
                Ok(None) => return None,
                Err(err) => {
                    debug!(path = %file.path.display(), "sniff failed: {err}");
                    return None;
                }
            };
            debug!(path = %file.path.display(), mime = kind.mime_type(), "sniffed");
            mime_classification(kind.mime_type())
        }
    }
}

#[cfg(feature = "sniff")]
pub use sniffer::MimeSniffer;
