//! Crate-level test suite: shared fakes and end-to-end presentation scenarios.

pub(crate) mod support;
