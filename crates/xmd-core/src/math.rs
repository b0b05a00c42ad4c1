use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};

use crate::backend::{MathError, MathRenderer};

const FONT_PATHS_VAR: &str = "XMD_FONT_PATHS";
const CACHE_SIZE: usize = 128;

/// Renders math written in typst notation to inline SVG.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypstMath;

impl MathRenderer for TypstMath {
    fn render(&self, source: &str, display: bool) -> Result<String, MathError> {
        render_svg(source, display)
    }
}

/// Single-file world holding the wrapped equation.
struct EquationWorld<'a> {
    library: &'a LazyHash<Library>,
    book: LazyHash<FontBook>,
    fonts: &'a [Font],
    source: Source,
    main_id: FileId,
}

impl World for EquationWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main_id
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main_id {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        None
    }
}

struct FontSet {
    book: FontBook,
    fonts: Vec<Font>,
}

impl FontSet {
    fn load() -> Self {
        let mut set = Self {
            book: FontBook::new(),
            fonts: Vec::new(),
        };
        for data in typst_assets::fonts() {
            set.push(data);
        }
        for path in configured_font_files() {
            match std::fs::read(&path) {
                Ok(data) => set.push(data),
                Err(err) => log::warn!("skipping font {}: {}", path.display(), err),
            }
        }
        log::debug!("loaded {} fonts for math rendering", set.fonts.len());
        set
    }

    fn push<T>(&mut self, data: T)
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        for font in Font::iter(Bytes::new(data)) {
            self.book.push(font.info().clone());
            self.fonts.push(font);
        }
    }
}

fn configured_font_files() -> Vec<PathBuf> {
    let Ok(value) = std::env::var(FONT_PATHS_VAR) else {
        return Vec::new();
    };
    let separator = if cfg!(windows) { ';' } else { ':' };
    let mut files = Vec::new();
    for entry in value.split(separator).filter(|entry| !entry.is_empty()) {
        let path = PathBuf::from(entry);
        if path.is_dir() {
            let Ok(entries) = std::fs::read_dir(&path) else {
                continue;
            };
            let mut found: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| is_font_file(path))
                .collect();
            found.sort();
            files.extend(found);
        } else if is_font_file(&path) {
            files.push(path);
        }
    }
    files
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "ttf" | "otf" | "ttc" | "otc"))
}

type CacheKey = (String, bool);

static FONTS: Lazy<FontSet> = Lazy::new(FontSet::load);
static LIBRARY: Lazy<LazyHash<Library>> = Lazy::new(|| LazyHash::new(Library::default()));
static CACHE: Lazy<Mutex<LruCache<CacheKey, String>>> = Lazy::new(|| {
    let size = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(size))
});

fn render_svg(source: &str, display: bool) -> Result<String, MathError> {
    let key = (source.to_string(), display);
    if let Ok(mut cache) = CACHE.lock()
        && let Some(svg) = cache.get(&key)
    {
        return Ok(svg.clone());
    }

    let margin = if display { "0.5em" } else { "0.2em" };
    let wrapped = format!(
        "#set page(width: auto, height: auto, margin: {margin})\n#math.equation(block: {display}, $ {source} $)"
    );
    let main_id = FileId::new(None, VirtualPath::new("equation.typ"));
    let world = EquationWorld {
        library: &LIBRARY,
        book: LazyHash::new(FONTS.book.clone()),
        fonts: &FONTS.fonts,
        source: Source::new(main_id, wrapped),
        main_id,
    };

    let compiled = typst::compile::<PagedDocument>(&world);
    for warning in &compiled.warnings {
        log::debug!("typst math warning: {}", warning.message);
    }
    let document = compiled.output.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|err| err.message.to_string()).collect();
        MathError::Compile(messages.join("; "))
    })?;
    let page = document.pages.first().ok_or(MathError::Empty)?;
    let svg = typst_svg::svg(page);

    if let Ok(mut cache) = CACHE.lock() {
        cache.put(key, svg.clone());
    }
    Ok(svg)
}
