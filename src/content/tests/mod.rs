mod document_tests;
mod markdown_tests;
