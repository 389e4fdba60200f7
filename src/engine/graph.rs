// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Flow graph construction from the ordered module list.
//!
//! Modules run in list order unless a structural keyword says otherwise:
//!
//! ```text
//! IF ─port 0─▶ block ─▶ ENDIF          SPLIT ─port 0─▶ block ─▶ ENDSPLIT
//!  └─port 1─▶ ELSEIF ─port 0─▶ block ─▶ ENDIF    └─port 1──────────▶ ENDSPLIT
//!             └─port 1─▶ ELSE ─▶ block ─▶ ENDIF
//! ```
//!
//! Every edge points forward in the list, so list order is a topological order of the
//! graph.

use std::collections::VecDeque;

use crate::errors::ConfigError;
use crate::traits::BlockRole;

/// What the graph builder needs to know about one module.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub name: String,
    pub line: usize,
    pub role: Option<BlockRole>,
}

/// Edges of the flow graph, indexed like the module list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowGraph {
    /// Successor per output port. Empty for the terminal module.
    pub next: Vec<Vec<usize>>,
    /// Every module whose edges lead here, in list order.
    pub prev: Vec<Vec<usize>>,
    /// Reachable from the first module.
    pub reachable: Vec<bool>,
}

impl FlowGraph {
    /// Modules other than the first that no trace can reach.
    pub fn unreachable(&self) -> impl Iterator<Item = usize> + '_ {
        self.reachable
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, reachable)| !**reachable)
            .map(|(index, _)| index)
    }
}

/// A conditional block: the opening IF, its ELSEIF/ELSE alternatives and the ENDIF.
struct Conditional {
    alternatives: Vec<usize>,
    closer: usize,
}

struct Split {
    opener: usize,
    closer: usize,
}

enum Open {
    Conditional { alternatives: Vec<usize>, has_else: bool },
    Split(usize),
}

pub fn build_graph(nodes: &[GraphNode]) -> Result<FlowGraph, ConfigError> {
    let (conditionals, splits) = match_blocks(nodes)?;
    let count = nodes.len();

    let mut next: Vec<Vec<usize>> = (0..count)
        .map(|index| if index + 1 < count { vec![index + 1] } else { Vec::new() })
        .collect();

    for block in &conditionals {
        let bounds: Vec<usize> = block
            .alternatives
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(block.closer))
            .collect();

        for (alternative, end) in block.alternatives.iter().zip(&bounds) {
            let (start, end) = (*alternative, *end);
            let body = if start + 1 < end { start + 1 } else { block.closer };

            next[start] = match nodes[start].role {
                Some(BlockRole::Else) => vec![body],
                _ => vec![body, end],
            };
            if start + 1 < end {
                next[end - 1] = vec![block.closer];
            }
        }
    }

    for block in &splits {
        let body = if block.opener + 1 < block.closer {
            block.opener + 1
        } else {
            block.closer
        };
        next[block.opener] = vec![body, block.closer];
    }

    let mut prev = vec![Vec::new(); count];
    for (index, successors) in next.iter().enumerate() {
        for successor in successors {
            if !prev[*successor].contains(&index) {
                prev[*successor].push(index);
            }
        }
    }

    let mut reachable = vec![false; count];
    let mut pending = VecDeque::new();
    if count > 0 {
        reachable[0] = true;
        pending.push_back(0);
    }
    while let Some(index) = pending.pop_front() {
        for successor in &next[index] {
            if !reachable[*successor] {
                reachable[*successor] = true;
                pending.push_back(*successor);
            }
        }
    }

    Ok(FlowGraph {
        next,
        prev,
        reachable,
    })
}

fn match_blocks(nodes: &[GraphNode]) -> Result<(Vec<Conditional>, Vec<Split>), ConfigError> {
    let mut open: Vec<Open> = Vec::new();
    let mut conditionals = Vec::new();
    let mut splits = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let structure = |message: String| ConfigError::BlockStructure {
            line: node.line,
            message,
        };

        match node.role {
            None => {}
            Some(BlockRole::If) => open.push(Open::Conditional {
                alternatives: vec![index],
                has_else: false,
            }),
            Some(BlockRole::Split) => open.push(Open::Split(index)),
            Some(role @ (BlockRole::ElseIf | BlockRole::Else)) => match open.last_mut() {
                Some(Open::Conditional { has_else: true, .. }) => {
                    return Err(structure(format!("{} after ELSE", node.name)))
                }
                Some(Open::Conditional {
                    alternatives,
                    has_else,
                }) => {
                    alternatives.push(index);
                    *has_else = role == BlockRole::Else;
                }
                Some(Open::Split(_)) => {
                    return Err(structure(format!("{} inside a SPLIT block without IF", node.name)))
                }
                None => return Err(structure(format!("{} without IF", node.name))),
            },
            Some(BlockRole::EndIf) => match open.pop() {
                Some(Open::Conditional { alternatives, .. }) => conditionals.push(Conditional {
                    alternatives,
                    closer: index,
                }),
                Some(Open::Split(_)) => {
                    return Err(structure(format!("{} closes a SPLIT block; expected ENDSPLIT", node.name)))
                }
                None => return Err(structure(format!("{} without IF", node.name))),
            },
            Some(BlockRole::EndSplit) => match open.pop() {
                Some(Open::Split(opener)) => splits.push(Split {
                    opener,
                    closer: index,
                }),
                Some(Open::Conditional { .. }) => {
                    return Err(structure(format!("{} closes an IF block; expected ENDIF", node.name)))
                }
                None => return Err(structure(format!("{} without SPLIT", node.name))),
            },
        }
    }

    match open.pop() {
        Some(Open::Conditional { alternatives, .. }) => Err(ConfigError::BlockStructure {
            line: nodes[alternatives[0]].line,
            message: "IF without ENDIF".to_string(),
        }),
        Some(Open::Split(opener)) => Err(ConfigError::BlockStructure {
            line: nodes[opener].line,
            message: "SPLIT without ENDSPLIT".to_string(),
        }),
        None => Ok((conditionals, splits)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(names: &[&str]) -> Vec<GraphNode> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| GraphNode {
                name: name.to_string(),
                line: index + 1,
                role: match *name {
                    "IF" => Some(BlockRole::If),
                    "ELSEIF" => Some(BlockRole::ElseIf),
                    "ELSE" => Some(BlockRole::Else),
                    "ENDIF" => Some(BlockRole::EndIf),
                    "SPLIT" => Some(BlockRole::Split),
                    "ENDSPLIT" => Some(BlockRole::EndSplit),
                    _ => None,
                },
            })
            .collect()
    }

    #[test]
    fn test_plain_sequence() {
        let graph = build_graph(&nodes(&["IN", "A", "B"])).unwrap();
        assert_eq!(graph.next, vec![vec![1], vec![2], vec![]]);
        assert_eq!(graph.prev, vec![vec![], vec![0], vec![1]]);
        assert_eq!(graph.unreachable().count(), 0);
    }

    #[test]
    fn test_if_elseif_else() {
        //                    0     1     2    3         4    5       6    7        8
        let graph = build_graph(&nodes(&["IN", "IF", "A", "ELSEIF", "B", "ELSE", "C", "ENDIF", "OUT"]))
            .unwrap();

        assert_eq!(graph.next[1], vec![2, 3]);
        assert_eq!(graph.next[2], vec![7]);
        assert_eq!(graph.next[3], vec![4, 5]);
        assert_eq!(graph.next[4], vec![7]);
        assert_eq!(graph.next[5], vec![6]);
        assert_eq!(graph.next[6], vec![7]);
        assert_eq!(graph.next[7], vec![8]);
        assert_eq!(graph.prev[7], vec![2, 4, 6]);
    }

    #[test]
    fn test_empty_branches_go_to_closer() {
        //                    0     1     2       3        4
        let graph = build_graph(&nodes(&["IN", "IF", "ELSE", "ENDIF", "OUT"])).unwrap();
        assert_eq!(graph.next[1], vec![3, 2]);
        assert_eq!(graph.next[2], vec![3]);
        assert_eq!(graph.prev[3], vec![1, 2]);
    }

    #[test]
    fn test_nested_if_inside_split() {
        //                    0     1        2     3    4        5    6        7           8
        let graph = build_graph(&nodes(&[
            "IN", "SPLIT", "IF", "A", "ELSE", "B", "ENDIF", "ENDSPLIT", "OUT",
        ]))
        .unwrap();

        assert_eq!(graph.next[1], vec![2, 7]);
        assert_eq!(graph.next[2], vec![3, 4]);
        assert_eq!(graph.next[3], vec![6]);
        assert_eq!(graph.next[5], vec![6]);
        assert_eq!(graph.next[6], vec![7]);
        assert_eq!(graph.prev[7], vec![1, 6]);
        assert!(graph
            .next
            .iter()
            .enumerate()
            .all(|(index, successors)| successors.iter().all(|next| *next > index)));
    }

    #[test]
    fn test_structure_errors_name_the_line() {
        let cases: &[(&[&str], usize)] = &[
            (&["IN", "ELSE"], 2),
            (&["IN", "IF", "ELSE", "ELSEIF", "ENDIF"], 4),
            (&["IN", "IF", "A"], 2),
            (&["IN", "SPLIT", "ENDIF"], 3),
            (&["IN", "IF", "ENDSPLIT"], 3),
            (&["IN", "SPLIT", "A"], 2),
            (&["IN", "ENDSPLIT"], 2),
        ];

        for (names, expected_line) in cases {
            match build_graph(&nodes(names)) {
                Err(ConfigError::BlockStructure { line, .. }) => {
                    assert_eq!(line, *expected_line, "flow {:?}", names)
                }
                other => panic!("flow {:?}: expected a block structure error, got {:?}", names, other),
            }
        }
    }
}
