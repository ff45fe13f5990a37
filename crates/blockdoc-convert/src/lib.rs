/*!
 * Export and import collaborators for the blockdoc engine.
 *
 * Each exporter implements [`blockdoc_engine::export::ExportFormat`] and is
 * driven by the engine in document order; the engine hands every block over
 * with its resolved metadata (depth, alignment) so the serializers here never
 * reach into the store. The Markdown importer produces the ordered block
 * array [`Session::load_blocks`] accepts — the engine assigns final order
 * values and normalizes the batch before committing it.
 *
 * [`Session::load_blocks`]: blockdoc_engine::editing::Session::load_blocks
 */

mod inline;

pub mod email;
pub mod html;
pub mod import;
pub mod markdown;
pub mod text;

pub use email::EmailExport;
pub use html::HtmlExport;
pub use import::MarkdownImporter;
pub use markdown::MarkdownExport;
pub use text::TextExport;
