//! Scenario tests for portal traversal and frame rendering
