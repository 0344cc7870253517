//! Turning one pasted spreadsheet row into a Discussion excerpt:
//! row parsing, locator resolution, download, text extraction and
//! section location.

pub mod document;
pub mod fetcher;
pub mod reader;
pub mod reference;
pub mod row;
pub mod section;

pub use document::{ExtractedText, MediaKind, RawDocument};
pub use fetcher::{FetchConfig, FetchError, FetchedDocument, Fetcher};
pub use reader::{PdfReader, ReadError, ReaderConfig};
pub use reference::{looks_like_url, resolve_locator, DocumentLocator, LocatorSource};
pub use row::{parse_row, ParsedRow, RowNote};
pub use section::{DiscussionExcerpt, FallbackDirection, SectionConfig, SectionLocator};

use tracing::info;

/// Extract text from a document and locate its Discussion section.
pub async fn read_discussion(
    reader: &PdfReader,
    locator: &SectionLocator,
    document: &RawDocument,
) -> Result<(ExtractedText, DiscussionExcerpt), ReadError> {
    let extracted = reader.read_document(document).await?;
    let excerpt = locator.locate(&extracted.text);

    info!(
        digest = %document.digest,
        header = ?excerpt.header,
        stop = ?excerpt.stop,
        chars = excerpt.text.chars().count(),
        "Discussion excerpt ready"
    );

    Ok((extracted, excerpt))
}
