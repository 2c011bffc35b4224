//! Adapter tests: one file per backend, plus factory detection.

mod bull;
mod groupmq;
