// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stack-trace rewriting against the module graph
//!
//! Stacks raised inside compiled units reference module identifiers (the
//! origin annotation the sandbox appends). Rewriting maps those frames back
//! to the backing files so editors and terminals can jump to real sources.

use crate::graph::ModuleGraph;
use regex::Regex;

/// Rewrites `<id>:<line>:<column>` frame locations whose identifier is a
/// known graph record onto the record's backing file. Unknown locations are
/// left untouched.
pub fn rewrite_stacktrace(stack: &str, graph: &ModuleGraph) -> String {
    let frame = Regex::new(r"([^\s()]+):(\d+):(\d+)").unwrap();
    stack
        .lines()
        .map(|line| {
            frame
                .replace_all(line, |caps: &regex::Captures| {
                    let id = &caps[1];
                    match graph.get(id).and_then(|record| record.file.clone()) {
                        Some(file) => format!("{}:{}:{}", file.display(), &caps[2], &caps[3]),
                        None => caps[0].to_string(),
                    }
                })
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_known_frames() {
        let graph = ModuleGraph::new();
        graph.ensure_record("/src/a.js?v=123");

        let stack = "Error: boom\n    at render (/src/a.js?v=123:10:5)\n    at /src/a.js?v=123:20:1";
        let rewritten = rewrite_stacktrace(stack, &graph);
        assert_eq!(
            rewritten,
            "Error: boom\n    at render (/src/a.js:10:5)\n    at /src/a.js:20:1"
        );
    }

    #[test]
    fn test_unknown_frames_untouched() {
        let graph = ModuleGraph::new();
        let stack = "    at eval (unknown:1:1)";
        assert_eq!(rewrite_stacktrace(stack, &graph), stack);
    }

    #[test]
    fn test_virtual_modules_keep_their_id() {
        let graph = ModuleGraph::new();
        graph.ensure_record("\0virtual:config");

        let stack = "    at \0virtual:config:3:7";
        assert_eq!(rewrite_stacktrace(stack, &graph), stack);
    }
}
