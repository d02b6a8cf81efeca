/*!
 * Tests for the markdown and code cell pipelines
 */

use nbglot::app_config::ImageConfig;
use nbglot::errors::AppError;
use nbglot::images::ImageResolver;
use nbglot::language_utils::TargetLanguage;
use nbglot::notebook::{Cell, CellKind};
use nbglot::pipeline::code_cell::process_code_cell;
use nbglot::pipeline::integrity::{CodeLanguage, check_integrity};
use nbglot::pipeline::markdown_cell::process_markdown_cell;
use nbglot::pipeline::{CancellationFlag, CellContext, CellRouter, Route};

use crate::common::{CodeReply, StubCapability};

struct Fixture {
    stub: StubCapability,
    images: ImageResolver,
    code_language: CodeLanguage,
    cancel: CancellationFlag,
}

impl Fixture {
    fn new(stub: StubCapability) -> Self {
        Self {
            stub,
            images: ImageResolver::new(&ImageConfig::default(), "."),
            code_language: CodeLanguage::default(),
            cancel: CancellationFlag::new(),
        }
    }

    fn ctx(&self, language: TargetLanguage) -> CellContext<'_> {
        CellContext {
            language,
            labels: language.labels(),
            code_language: &self.code_language,
            capability: &self.stub,
            images: &self.images,
            cancel: &self.cancel,
        }
    }
}

#[tokio::test]
async fn test_markdown_withSameInputTwice_shouldBeIdentical() {
    let fixture = Fixture::new(StubCapability::new());
    let cell = Cell::new(CellKind::Markdown, "## Setup\n\nInstall the package first.\n");

    let first = process_markdown_cell(0, &cell, &fixture.ctx(TargetLanguage::Spanish)).await.unwrap();
    let second = process_markdown_cell(0, &cell, &fixture.ctx(TargetLanguage::Spanish)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.stats.translated_blocks, 2);
    assert_eq!(
        first.cell.source(),
        "## Setup\n\n**Traducción:**\n<TRANSLATED:Spanish>## Setup\n\nInstall the package first.\n\n**Traducción:**\n<TRANSLATED:Spanish>Install the package first.\n"
    );
}

#[tokio::test]
async fn test_markdown_withOnlyBlankLines_shouldBeUnchanged() {
    let fixture = Fixture::new(StubCapability::new());
    let cell = Cell::new(CellKind::Markdown, "\n\n---\n");

    let result = process_markdown_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await.unwrap();

    assert_eq!(result.cell, cell);
    assert_eq!(fixture.stub.calls(), 0);
}

#[tokio::test]
async fn test_markdown_withFailingDescription_shouldMarkOnlyThatImage() {
    let fixture = Fixture::new(StubCapability::new().failing_descriptions());
    let cell = Cell::new(
        CellKind::Markdown,
        "Look:\n\n![dot](data:image/png;base64,iVBORw0KGgo=)\n",
    );

    let result = process_markdown_cell(3, &cell, &fixture.ctx(TargetLanguage::English)).await.unwrap();

    let source = result.cell.source();
    assert!(source.contains("**Translation:**\n<TRANSLATED:English>Look:"));
    assert!(source.contains("**Image Description:**\n[Image description failed: Model returned an empty response]"));
    assert_eq!(result.stats.translated_blocks, 1);
    assert_eq!(result.stats.failure_markers, 1);
}

#[tokio::test]
async fn test_markdown_afterCancel_shouldReturnCancelled() {
    let fixture = Fixture::new(StubCapability::new());
    fixture.cancel.cancel();
    let cell = Cell::new(CellKind::Markdown, "Hello");

    let result = process_markdown_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await;

    assert!(matches!(result, Err(AppError::Cancelled)));
    assert_eq!(fixture.stub.calls(), 0);
}

#[tokio::test]
async fn test_code_withReorderedStatements_shouldFallBackToOriginal() {
    let reply = CodeReply::Fixed("# swapped\ny = 2\nx = 1".to_string());
    let fixture = Fixture::new(StubCapability::new().with_code_reply(reply));
    let cell = Cell::new(CellKind::Code, "x = 1\ny = 2");

    let result = process_code_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await.unwrap();

    assert_eq!(result.cell, cell);
    assert!(result.stats.integrity_fallback);
}

#[tokio::test]
async fn test_code_withStatementReindentedIntoLoop_shouldFallBackToOriginal() {
    let reply = CodeReply::Fixed("# 循环\nfor i in x:\n    a()\n    b()".to_string());
    let fixture = Fixture::new(StubCapability::new().with_code_reply(reply));
    let cell = Cell::new(CellKind::Code, "for i in x:\n    a()\nb()");

    let result = process_code_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await.unwrap();

    assert_eq!(result.cell, cell);
    assert!(result.stats.integrity_fallback);
}

#[tokio::test]
async fn test_code_withInlineCommentAdded_shouldAccept() {
    let reply = CodeReply::Fixed("# 计算\ntotal = a + b  # 求和\n".to_string());
    let fixture = Fixture::new(StubCapability::new().with_code_reply(reply));
    let cell = Cell::new(CellKind::Code, "total = a + b\n");

    let result = process_code_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await.unwrap();

    assert_eq!(result.cell.source(), "# 计算\ntotal = a + b  # 求和\n");
    assert!(!result.stats.integrity_fallback);
}

#[tokio::test]
async fn test_code_withEmptySource_shouldSkipCapability() {
    let fixture = Fixture::new(StubCapability::new());
    let cell = Cell::new(CellKind::Code, "  \n");

    let result = process_code_cell(0, &cell, &fixture.ctx(TargetLanguage::Chinese)).await.unwrap();

    assert_eq!(result.cell, cell);
    assert_eq!(fixture.stub.calls(), 0);
}

#[test]
fn test_code_withCommentOnlyReply_shouldKeepOriginalCode() {
    let fixture = Fixture::new(StubCapability::new().with_code_reply(CodeReply::Comment));
    let cell = Cell::new(CellKind::Code, "print(1)");

    let result = tokio_test::block_on(process_code_cell(0, &cell, &fixture.ctx(TargetLanguage::Spanish))).unwrap();

    assert!(result.cell.source().ends_with("\nprint(1)"));
    assert!(result.cell.source().starts_with("# "));
    assert!(!result.stats.integrity_fallback);
}

#[test]
fn test_check_integrity_withDeletedStatement_shouldReportPosition() {
    let lang = CodeLanguage::default();
    let violation = check_integrity("a = 1\nb = 2\nc = 3", "# c\na = 1\nc = 3", &lang).unwrap_err();
    assert_eq!(violation.position, 2);
    assert_eq!(violation.expected.as_deref(), Some("b = 2"));
    assert_eq!(violation.found.as_deref(), Some("c = 3"));
}

#[test]
fn test_check_integrity_withCLikeLanguage_shouldUseSlashComments() {
    let lang = CodeLanguage::from_notebook_language(Some("C++"));
    assert!(check_integrity("int x = 1;", "// set x\nint x = 1; // one", &lang).is_ok());
    assert!(check_integrity("int x = 1;", "# set x\nint x = 1;", &lang).is_err());
}

#[test]
fn test_router_shouldVisitEveryCellOnceInOrder() {
    let cells = vec![
        Cell::new(CellKind::Code, "a"),
        Cell::new(CellKind::Other("raw".to_string()), "b"),
        Cell::new(CellKind::Markdown, "c"),
        Cell::new(CellKind::Other("heading".to_string()), "d"),
    ];
    let dispatches: Vec<(usize, Route)> = CellRouter::new(&cells).map(|d| (d.index, d.route)).collect();
    assert_eq!(
        dispatches,
        vec![
            (0, Route::Code),
            (1, Route::PassThrough),
            (2, Route::Markdown),
            (3, Route::PassThrough)
        ]
    );
    assert_eq!(CellRouter::new(&[]).count(), 0);
}
