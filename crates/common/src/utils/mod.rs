//! Small cross-cutting helpers.

pub mod logging;
