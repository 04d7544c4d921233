//! Extension-based classification rule table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::file::Classification;

type Table = &'static [(&'static str, &'static [(&'static str, &'static [&'static str])])];

const BUILTIN_RULES: Table = &[
    (
        "Docs",
        &[
            ("Word", &[".doc", ".docx", ".odt"]),
            ("PDFs", &[".pdf"]),
            ("Text", &[".txt", ".rtf", ".md", ".log"]),
            ("Sheets", &[".xls", ".xlsx", ".csv", ".ods"]),
            ("Presentations", &[".ppt", ".pptx", ".odp"]),
            ("Ebooks", &[".epub", ".mobi", ".azw", ".azw3"]),
        ],
    ),
    (
        "Audio",
        &[
            ("Music", &[".mp3", ".flac", ".ogg", ".wav", ".wma", ".m4a", ".aac", ".opus"]),
            ("Podcasts", &[".m4b"]),
            ("VoiceMemos", &[".amr", ".3ga"]),
        ],
    ),
    (
        "Pics",
        &[
            (
                "Photos",
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".heic", ".webp", ".avif", ".jxl"],
            ),
            ("Vector", &[".svg", ".ai", ".eps"]),
            ("Raw", &[".cr2", ".nef", ".dng", ".arw", ".raw"]),
            ("Icons", &[".ico"]),
        ],
    ),
    (
        "Vids",
        &[
            ("Movies", &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm"]),
            ("Clips", &[".3gp", ".m4v"]),
        ],
    ),
    (
        "Programs",
        &[
            ("Windows", &[".exe", ".msi", ".dll", ".bat", ".cmd"]),
            ("Mac", &[".dmg", ".pkg", ".app"]),
            ("Linux", &[".deb", ".rpm", ".appimage", ".snap"]),
            ("Android", &[".apk", ".apkm", ".xapk"]),
        ],
    ),
    (
        "Code",
        &[
            ("Web", &[".html", ".htm", ".css", ".js", ".jsx", ".ts", ".tsx", ".vue", ".mjs", ".wasm"]),
            ("Python", &[".py", ".pyw", ".pyx", ".ipynb"]),
            ("C", &[".c", ".h", ".cpp", ".hpp", ".cc", ".cxx"]),
            ("Shell", &[".sh", ".bash", ".zsh", ".fish"]),
            ("Java", &[".java", ".jar", ".class"]),
            ("Go", &[".go", ".mod", ".sum"]),
            ("Ruby", &[".rb", ".rake"]),
            ("PHP", &[".php"]),
            ("Rust", &[".rs", ".toml"]),
            ("Swift", &[".swift"]),
            ("Kotlin", &[".kt", ".kts"]),
            ("Zig", &[".zig"]),
        ],
    ),
    (
        "Archives",
        &[
            ("Compressed", &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".lz", ".lzma"]),
            ("Disk", &[".iso", ".img", ".dmg"]),
        ],
    ),
    (
        "System",
        &[
            ("Models", &[".gguf", ".bin", ".pt", ".pth", ".onnx"]),
            ("Libraries", &[".so", ".dylib"]),
            ("Cabinets", &[".cab"]),
            ("Fonts", &[".ttf", ".otf", ".woff", ".woff2"]),
        ],
    ),
    (
        "Apps",
        &[
            ("Ableton", &[".asd", ".alc", ".als"]),
            ("SPSS", &[".sav", ".sps"]),
            ("Gameboy", &[".gbc", ".gba", ".gb"]),
            ("OfficeThemes", &[".thmx"]),
            ("Calendar", &[".ics"]),
            ("Database", &[".db", ".sqlite", ".sqlite3", ".mdb", ".accdb"]),
        ],
    ),
    (
        "Web",
        &[
            ("Links", &[".url", ".webloc"]),
            ("Data", &[".json", ".xml", ".yaml", ".yml"]),
        ],
    ),
    (
        "Misc",
        &[
            ("Temporary", &[".crdownload", ".tmp", ".temp", ".cache"]),
            ("Generic", &[".dat"]),
            ("Unsorted", &[]),
        ],
    ),
];

/// Ordered category -> subcategory -> extensions table.
///
/// Lookups scan categories and subcategories in declaration order; the first
/// list containing the extension wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationRules(IndexMap<String, IndexMap<String, Vec<String>>>);

impl Default for ClassificationRules {
    fn default() -> Self {
        let table = BUILTIN_RULES
            .iter()
            .map(|(category, subs)| {
                let subs = subs
                    .iter()
                    .map(|(sub, exts)| {
                        (sub.to_string(), exts.iter().map(|e| e.to_string()).collect())
                    })
                    .collect();
                (category.to_string(), subs)
            })
            .collect();
        Self(table)
    }
}

impl ClassificationRules {
    /// An empty table.
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }

    /// Add or replace one subcategory.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        subcategory: impl Into<String>,
        extensions: impl IntoIterator<Item = impl AsRef<str>>,
    ) {
        let extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        self.0
            .entry(category.into())
            .or_default()
            .insert(subcategory.into(), extensions);
    }

    /// Find the bucket for an extension such as `.PDF` or `pdf`.
    pub fn lookup(&self, extension: &str) -> Option<Classification> {
        if extension.is_empty() {
            return None;
        }
        let wanted = normalize_extension(extension);
        self.0.iter().find_map(|(category, subs)| {
            subs.iter()
                .find(|(_, exts)| exts.iter().any(|e| *e == wanted))
                .map(|(sub, _)| Classification::new(category.as_str(), sub.as_str()))
        })
    }

    /// Overlay `user` categories on top of `self`.
    ///
    /// A category present in both is replaced wholesale; new categories are
    /// appended in their declared order.
    pub fn merged(mut self, user: ClassificationRules) -> Self {
        for (category, subs) in user.0 {
            self.0.insert(category, subs);
        }
        self.normalized()
    }

    /// Lower-case every extension and ensure it carries a leading dot.
    pub fn normalized(mut self) -> Self {
        for subs in self.0.values_mut() {
            for exts in subs.values_mut() {
                for ext in exts.iter_mut() {
                    *ext = normalize_extension(ext);
                }
            }
        }
        self
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether the table has no categories.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
