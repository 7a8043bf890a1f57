//! Property-based tests for the numeric passes.

#[cfg(test)]
mod fusion_props;
