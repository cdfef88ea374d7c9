// Reusable services layer
//
// Logic here is independent of table ingestion and output so that the CLI
// and the pipeline share a single implementation.

pub mod matching;
