//! Pipeline stages for content analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network-facing ones can be swapped for scripted stand-ins.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──┬──▶ score ───────────────────┬──▶ result
//! (upload)  (OCR/size) └──▶ llm ──▶ normalize ───────┘
//!                          (chat)   (JSON → schema)
//! ```
//!
//! 1. [`input`]     — media kind, admission checks, loading from disk
//! 2. [`extract`]   — OCR for images, size-band note for PDFs and OCR failures
//! 3. [`ocr`]       — the OCR collaborator behind [`ocr::OcrEngine`]
//! 4. [`score`]     — pure heuristic scoring of the extracted text
//! 5. [`llm`]       — enrichment calls with retry, backoff and model fallback;
//!    the only stage besides OCR with network I/O
//! 6. [`normalize`] — coerce the model reply into the fixed enrichment schema
//!
//! Data only flows downstream; no stage calls back into an earlier one.

pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod score;
