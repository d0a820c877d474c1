// Depth-counting scans that stand in for nesting pointers.
//
// All scans are pure over a command slice so they can be tested without a runtime.
// Loops and conditionals are matched independently of each other.

use crate::domain::command::{Block, Command};

/// Where a false `IF` continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget {
    /// Same-depth `ELSE` at this index.
    Else(usize),
    /// Same-depth `END_IF` at this index.
    EndIf(usize),
    /// No close exists; the conditional body runs to the end of the program.
    Unclosed,
}

/// Finds the `ELSE` or `END_IF` that closes the conditional opened at `if_pc`.
pub fn branch_target(commands: &[Command], if_pc: usize) -> BranchTarget {
    let mut depth = 0usize;
    for (i, cmd) in commands.iter().enumerate().skip(if_pc + 1) {
        match cmd.block {
            Block::If { .. } => depth += 1,
            Block::Else if depth == 0 => return BranchTarget::Else(i),
            Block::EndIf if depth == 0 => return BranchTarget::EndIf(i),
            Block::EndIf => depth -= 1,
            _ => {}
        }
    }
    BranchTarget::Unclosed
}

/// Finds the `END_IF` that closes the else-branch starting at `else_pc`.
pub fn matching_end_if(commands: &[Command], else_pc: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, cmd) in commands.iter().enumerate().skip(else_pc + 1) {
        match cmd.block {
            Block::If { .. } => depth += 1,
            Block::EndIf if depth == 0 => return Some(i),
            Block::EndIf => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Finds the `END_REPEAT` that closes the loop opened at `open_pc`.
pub fn matching_loop_end(commands: &[Command], open_pc: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, cmd) in commands.iter().enumerate().skip(open_pc + 1) {
        match cmd.block {
            Block::Repeat { .. } | Block::Forever => depth += 1,
            Block::EndRepeat if depth == 0 => return Some(i),
            Block::EndRepeat => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Structural problem found by [`audit`]. The interpreter tolerates all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureIssue {
    StrayLoopEnd { index: usize },
    StrayElse { index: usize },
    DuplicateElse { index: usize },
    StrayEndIf { index: usize },
    UnclosedLoop { index: usize },
    UnclosedIf { index: usize },
}

impl std::fmt::Display for StructureIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureIssue::StrayLoopEnd { index } => {
                write!(f, "loop end at {index} closes nothing")
            }
            StructureIssue::StrayElse { index } => write!(f, "else at {index} has no open if"),
            StructureIssue::DuplicateElse { index } => {
                write!(f, "else at {index} follows another else")
            }
            StructureIssue::StrayEndIf { index } => write!(f, "end-if at {index} closes nothing"),
            StructureIssue::UnclosedLoop { index } => write!(f, "loop at {index} is never closed"),
            StructureIssue::UnclosedIf { index } => write!(f, "if at {index} is never closed"),
        }
    }
}

enum Open {
    Loop(usize),
    If { index: usize, has_else: bool },
}

/// Walks the program once with a combined open-block stack and reports every mismatch.
pub fn audit(commands: &[Command]) -> Vec<StructureIssue> {
    let mut issues = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for (i, cmd) in commands.iter().enumerate() {
        match cmd.block {
            Block::Repeat { .. } | Block::Forever => stack.push(Open::Loop(i)),
            Block::If { .. } => stack.push(Open::If {
                index: i,
                has_else: false,
            }),
            Block::Else => match stack.last_mut() {
                Some(Open::If { has_else, .. }) if !*has_else => *has_else = true,
                Some(Open::If { .. }) => issues.push(StructureIssue::DuplicateElse { index: i }),
                _ => issues.push(StructureIssue::StrayElse { index: i }),
            },
            Block::EndIf => match stack.last() {
                Some(Open::If { .. }) => {
                    stack.pop();
                }
                _ => issues.push(StructureIssue::StrayEndIf { index: i }),
            },
            Block::EndRepeat => match stack.last() {
                Some(Open::Loop(_)) => {
                    stack.pop();
                }
                _ => issues.push(StructureIssue::StrayLoopEnd { index: i }),
            },
            _ => {}
        }
    }

    issues.extend(stack.into_iter().map(|open| match open {
        Open::Loop(index) => StructureIssue::UnclosedLoop { index },
        Open::If { index, .. } => StructureIssue::UnclosedIf { index },
    }));
    issues
}
