//! Direction-agnostic dataflow traversal engine.
//!
//! The engine walks a statement sequence in the analysis's direction,
//! invoking a transfer hook per statement kind (identity by default),
//! merging at control-flow joins and iterating loops to a fixed point.
//! Per-statement values are recorded into pre/post maps keyed by node id;
//! these maps are what analyses expose as their result.
//!
//! Control-transfer statements are sinks. Walking forward, the current
//! value is pushed into the corresponding exit collector (`return`,
//! `break`, `continue`) and flows on unchanged — anything after the jump
//! is unreachable and its recorded values are harmless. Walking backward,
//! the current value is *re-seeded*: at `return` with the caller-supplied
//! seed, at `break`/`continue` with the enclosing loop's exit and
//! continue-target values.

use std::collections::HashMap;

use tracing::trace;

use crate::analysis::lattice::limits::MAX_LOOP_FIXPOINT_ITERATIONS;
use crate::error::AnalysisError;
use crate::ir::{Expr, NodeId, Stmt, StmtKind, StmtSeq};

/// Traversal direction of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A dataflow analysis: an `Info` lattice, a merge, and per-statement
/// transfer hooks. Hooks default to the identity.
pub trait DataflowAnalysis {
    type Info: Clone + PartialEq;

    const DIRECTION: Direction;

    fn merge(&mut self, a: &Self::Info, b: &Self::Info) -> Self::Info;

    fn transfer_assign(
        &mut self,
        info: Self::Info,
        _stmt_id: NodeId,
        _lhs: &[Expr],
        _rhs: &Expr,
    ) -> Result<Self::Info, AnalysisError> {
        Ok(info)
    }

    fn transfer_expr(
        &mut self,
        info: Self::Info,
        _stmt_id: NodeId,
        _expr: &Expr,
    ) -> Result<Self::Info, AnalysisError> {
        Ok(info)
    }

    /// Applied to the condition of an if/else. The branches themselves are
    /// walked by the engine.
    fn transfer_cond(&mut self, info: Self::Info, _cond: &Expr) -> Self::Info {
        info
    }
}

/// Result of running an analysis over a statement sequence.
pub struct RunResult<I> {
    /// Value at the sequence exit (walking forward: fall-through; walking
    /// backward: the sequence entry).
    pub exit: I,
    /// Values collected at `return` statements (forward only).
    pub ret_points: Vec<I>,
    /// Value before each statement's transfer, in walk order.
    pub pre_map: HashMap<NodeId, I>,
    /// Value after each statement's transfer, in walk order.
    pub post_map: HashMap<NodeId, I>,
}

/// Runs `analysis` over `seq` from `entry`.
///
/// `ret_seed` is the value re-seeded at `return` statements and is only
/// meaningful for backward analyses. Unmatched `break`/`continue` at the
/// top level of `seq` is a structural error.
pub fn run<A: DataflowAnalysis>(
    analysis: &mut A,
    entry: A::Info,
    seq: &StmtSeq,
    ret_seed: Option<A::Info>,
) -> Result<RunResult<A::Info>, AnalysisError> {
    let mut engine = Engine {
        analysis,
        pre_map: HashMap::new(),
        post_map: HashMap::new(),
        ret_points: Vec::new(),
        ret_seed,
    };

    let mut breaks = Vec::new();
    let mut conts = Vec::new();
    let exit = engine.run_seq(entry, seq, &mut breaks, &mut conts, None)?;

    if let Some((node, _)) = breaks.into_iter().chain(conts).next() {
        return Err(AnalysisError::UnmatchedJump { node });
    }

    Ok(RunResult {
        exit,
        ret_points: engine.ret_points,
        pre_map: engine.pre_map,
        post_map: engine.post_map,
    })
}

/// Break/continue seeds of the enclosing loop, used by backward walks.
struct LoopSeeds<'a, I> {
    break_seed: &'a I,
    cont_seed: &'a I,
}

struct Engine<'a, A: DataflowAnalysis> {
    analysis: &'a mut A,
    pre_map: HashMap<NodeId, A::Info>,
    post_map: HashMap<NodeId, A::Info>,
    ret_points: Vec<A::Info>,
    ret_seed: Option<A::Info>,
}

impl<'a, A: DataflowAnalysis> Engine<'a, A> {
    /// Walks one sequence. `breaks`/`conts` collect forward jump values
    /// (with the jump's node for error reporting); `seeds` carries the
    /// backward re-seed values of the enclosing loop.
    fn run_seq(
        &mut self,
        entry: A::Info,
        seq: &StmtSeq,
        breaks: &mut Vec<(NodeId, A::Info)>,
        conts: &mut Vec<(NodeId, A::Info)>,
        seeds: Option<&LoopSeeds<'_, A::Info>>,
    ) -> Result<A::Info, AnalysisError> {
        let mut cur = entry;
        self.pre_map.insert(seq.id, cur.clone());

        match A::DIRECTION {
            Direction::Forward => {
                for stmt in &seq.stmts {
                    cur = self.run_stmt(cur, stmt, breaks, conts, seeds)?;
                }
            }
            Direction::Backward => {
                for stmt in seq.stmts.iter().rev() {
                    cur = self.run_stmt(cur, stmt, breaks, conts, seeds)?;
                }
            }
        }

        self.post_map.insert(seq.id, cur.clone());
        Ok(cur)
    }

    fn run_stmt(
        &mut self,
        cur: A::Info,
        stmt: &Stmt,
        breaks: &mut Vec<(NodeId, A::Info)>,
        conts: &mut Vec<(NodeId, A::Info)>,
        seeds: Option<&LoopSeeds<'_, A::Info>>,
    ) -> Result<A::Info, AnalysisError> {
        self.pre_map.insert(stmt.id, cur.clone());

        let out = match &stmt.kind {
            StmtKind::Assign { lhs, rhs } => {
                self.analysis.transfer_assign(cur, stmt.id, lhs, rhs)?
            }
            StmtKind::Expr(e) => self.analysis.transfer_expr(cur, stmt.id, e)?,

            StmtKind::Break => match (A::DIRECTION, seeds) {
                (Direction::Forward, _) => {
                    breaks.push((stmt.id, cur.clone()));
                    cur
                }
                (Direction::Backward, Some(s)) => s.break_seed.clone(),
                (Direction::Backward, None) => {
                    return Err(AnalysisError::UnmatchedJump { node: stmt.id })
                }
            },
            StmtKind::Continue => match (A::DIRECTION, seeds) {
                (Direction::Forward, _) => {
                    conts.push((stmt.id, cur.clone()));
                    cur
                }
                (Direction::Backward, Some(s)) => s.cont_seed.clone(),
                (Direction::Backward, None) => {
                    return Err(AnalysisError::UnmatchedJump { node: stmt.id })
                }
            },
            StmtKind::Return => match A::DIRECTION {
                Direction::Forward => {
                    self.ret_points.push(cur.clone());
                    cur
                }
                Direction::Backward => match &self.ret_seed {
                    Some(seed) => seed.clone(),
                    None => cur,
                },
            },

            StmtKind::IfElse {
                cond,
                then_seq,
                else_seq,
            } => {
                // The condition is a program point but not a transfer; it
                // is recorded with the join-side value.
                self.pre_map.insert(cond.id, cur.clone());
                self.post_map.insert(cond.id, cur.clone());

                let then_out = self.run_seq(cur.clone(), then_seq, breaks, conts, seeds)?;
                let else_out = self.run_seq(cur, else_seq, breaks, conts, seeds)?;
                let joined = self.analysis.merge(&then_out, &else_out);
                self.analysis.transfer_cond(joined, cond)
            }

            StmtKind::Loop {
                init,
                test,
                body,
                incr,
            } => match A::DIRECTION {
                Direction::Forward => self.run_loop_forward(cur, stmt.id, init, test, body, incr)?,
                Direction::Backward => {
                    self.run_loop_backward(cur, stmt.id, init, test, body, incr)?
                }
            },
        };

        self.post_map.insert(stmt.id, out.clone());
        Ok(out)
    }

    /// Forward loop fixed point.
    ///
    /// Maintains the incrementation-exit value; each round walks
    /// test/body/incr, folding continue points into the incr entry and
    /// break points (plus the test exit) into the loop exit. Stops when
    /// the incr exit stops changing.
    fn run_loop_forward(
        &mut self,
        entry: A::Info,
        loop_id: NodeId,
        init: &StmtSeq,
        test: &StmtSeq,
        body: &StmtSeq,
        incr: &StmtSeq,
    ) -> Result<A::Info, AnalysisError> {
        let init_exit = self.run_straightline(entry, init)?;
        let mut cur_incr_exit = init_exit.clone();

        for round in 0..MAX_LOOP_FIXPOINT_ITERATIONS {
            let test_in = self.analysis.merge(&init_exit, &cur_incr_exit);
            let test_out = self.run_straightline(test_in, test)?;

            let mut breaks = Vec::new();
            let mut conts = Vec::new();
            let body_out = self.run_seq(test_out.clone(), body, &mut breaks, &mut conts, None)?;

            // The test exit reaches the loop exit (test false); the body
            // exit reaches the incrementation (fall-through continue).
            let mut exit = test_out;
            for (_, b) in &breaks {
                exit = self.analysis.merge(&exit, b);
            }

            let mut incr_in = body_out;
            for (_, c) in &conts {
                incr_in = self.analysis.merge(&incr_in, c);
            }

            let incr_out = self.run_straightline(incr_in, incr)?;

            if incr_out == cur_incr_exit {
                trace!(round, "loop fixed point reached");
                return Ok(exit);
            }
            cur_incr_exit = incr_out;
        }

        Err(AnalysisError::FixedPointDivergence {
            node: loop_id,
            iterations: MAX_LOOP_FIXPOINT_ITERATIONS,
        })
    }

    /// Backward loop fixed point (live-variable style).
    ///
    /// `after` is the value flowing backward into the loop from below.
    /// Iterates the test-entry value: the body is walked with the loop
    /// exit as break seed and the incrementation entry as continue seed.
    fn run_loop_backward(
        &mut self,
        after: A::Info,
        loop_id: NodeId,
        init: &StmtSeq,
        test: &StmtSeq,
        body: &StmtSeq,
        incr: &StmtSeq,
    ) -> Result<A::Info, AnalysisError> {
        // First approximation ignores the body: only the exit edge.
        let mut test_in = self.run_straightline(after.clone(), test)?;

        for _round in 0..MAX_LOOP_FIXPOINT_ITERATIONS {
            let incr_in = self.run_straightline(test_in.clone(), incr)?;

            let seeds = LoopSeeds {
                break_seed: &after,
                cont_seed: &incr_in,
            };
            let mut breaks = Vec::new();
            let mut conts = Vec::new();
            let body_in =
                self.run_seq(incr_in.clone(), body, &mut breaks, &mut conts, Some(&seeds))?;

            let test_after = self.analysis.merge(&body_in, &after);
            let new_test_in = self.run_straightline(test_after, test)?;

            if new_test_in == test_in {
                return self.run_straightline(test_in, init);
            }
            test_in = new_test_in;
        }

        Err(AnalysisError::FixedPointDivergence {
            node: loop_id,
            iterations: MAX_LOOP_FIXPOINT_ITERATIONS,
        })
    }

    /// Walks a loop section that must not contain jumps (init, test,
    /// incr). A jump here is a lowering bug.
    fn run_straightline(
        &mut self,
        entry: A::Info,
        seq: &StmtSeq,
    ) -> Result<A::Info, AnalysisError> {
        let mut breaks = Vec::new();
        let mut conts = Vec::new();
        let out = self.run_seq(entry, seq, &mut breaks, &mut conts, None)?;
        if let Some((node, _)) = breaks.into_iter().chain(conts).next() {
            return Err(AnalysisError::UnmatchedJump { node });
        }
        Ok(out)
    }
}
