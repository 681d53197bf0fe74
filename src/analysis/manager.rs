//! Analysis result cache and inter-procedural recursion guard.
//!
//! Every analysis request goes through the manager. Results are memoized
//! by `(analysis id, function, body, input-argument types)` and shared
//! immutably (`Rc`); a request whose key is already being computed is a
//! cycle in the inter-procedural call structure and is answered with the
//! analysis's *bottom* instead of recursing — that answer is not cached,
//! so the outer computation still produces and caches the real result.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::analysis::lattice::TypeSetString;
use crate::analysis::live_vars::{compute_live_vars, LiveVarInfo};
use crate::analysis::reach_defs::{compute_reach_defs, ReachDefInfo};
use crate::analysis::typeinf::{compute_type_info, TypeInferInfo};
use crate::error::AnalysisError;
use crate::ir::{FunctionId, NodeId, Program, StmtSeq};

/// Identifies one of the registered analyses in a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AnalysisId {
    ReachDefs,
    LiveVars,
    TypeInfer,
}

/// Cache key: analysis, function, body, input types. The input-type
/// component hashes structurally through `TypeInfo`'s derived `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    analysis: AnalysisId,
    function: FunctionId,
    body: NodeId,
    in_arg_types: TypeSetString,
}

/// Memoizing analysis manager.
///
/// Single-threaded: re-entrancy happens through recursive `request_*`
/// calls during inter-procedural inference, never through threads.
pub struct AnalysisManager<'p> {
    program: &'p Program,
    reach_defs: HashMap<CacheKey, Rc<ReachDefInfo>>,
    live_vars: HashMap<CacheKey, Rc<LiveVarInfo>>,
    type_infer: HashMap<CacheKey, Rc<TypeInferInfo>>,
    in_progress: HashSet<CacheKey>,
}

impl<'p> AnalysisManager<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            reach_defs: HashMap::new(),
            live_vars: HashMap::new(),
            type_infer: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// The program this manager analyzes. The returned reference is
    /// independent of the manager borrow.
    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Requests reaching definitions for `(function, body, in_arg_types)`.
    pub fn request_reach_defs(
        &mut self,
        function: FunctionId,
        body: &StmtSeq,
        in_arg_types: &TypeSetString,
    ) -> Result<Rc<ReachDefInfo>, AnalysisError> {
        let key = CacheKey {
            analysis: AnalysisId::ReachDefs,
            function,
            body: body.id,
            in_arg_types: in_arg_types.clone(),
        };
        if let Some(hit) = self.reach_defs.get(&key) {
            return Ok(hit.clone());
        }
        if self.in_progress.contains(&key) {
            trace!(?function, "recursive reach-defs request, returning bottom");
            return Ok(Rc::new(compute_reach_defs(
                self.program,
                function,
                body,
                in_arg_types,
                true,
            )?));
        }

        self.in_progress.insert(key.clone());
        let result = compute_reach_defs(self.program, function, body, in_arg_types, false);
        self.in_progress.remove(&key);

        let info = Rc::new(result?);
        self.reach_defs.insert(key, info.clone());
        Ok(info)
    }

    /// Requests live variables for `(function, body, in_arg_types)`.
    pub fn request_live_vars(
        &mut self,
        function: FunctionId,
        body: &StmtSeq,
        in_arg_types: &TypeSetString,
    ) -> Result<Rc<LiveVarInfo>, AnalysisError> {
        let key = CacheKey {
            analysis: AnalysisId::LiveVars,
            function,
            body: body.id,
            in_arg_types: in_arg_types.clone(),
        };
        if let Some(hit) = self.live_vars.get(&key) {
            return Ok(hit.clone());
        }
        if self.in_progress.contains(&key) {
            trace!(?function, "recursive live-vars request, returning bottom");
            return Ok(Rc::new(compute_live_vars(
                self.program,
                function,
                body,
                in_arg_types,
                true,
            )?));
        }

        self.in_progress.insert(key.clone());
        let result = compute_live_vars(self.program, function, body, in_arg_types, false);
        self.in_progress.remove(&key);

        let info = Rc::new(result?);
        self.live_vars.insert(key, info.clone());
        Ok(info)
    }

    /// Requests type inference for `(function, body, in_arg_types)`.
    ///
    /// Inter-procedural inference re-enters here for callees; a cycle
    /// (directly or mutually recursive functions) resolves to the bottom
    /// summary — empty output type sets — which the caller unions away.
    pub fn request_type_info(
        &mut self,
        function: FunctionId,
        body: &StmtSeq,
        in_arg_types: &TypeSetString,
    ) -> Result<Rc<TypeInferInfo>, AnalysisError> {
        let key = CacheKey {
            analysis: AnalysisId::TypeInfer,
            function,
            body: body.id,
            in_arg_types: in_arg_types.clone(),
        };
        if let Some(hit) = self.type_infer.get(&key) {
            return Ok(hit.clone());
        }
        if self.in_progress.contains(&key) {
            trace!(?function, "recursive type-inference request, returning bottom");
            return Ok(Rc::new(compute_type_info(
                self,
                function,
                body,
                in_arg_types,
                true,
            )?));
        }

        self.in_progress.insert(key.clone());
        let result = compute_type_info(self, function, body, in_arg_types, false);
        self.in_progress.remove(&key);

        let info = Rc::new(result?);
        self.type_infer.insert(key, info.clone());
        Ok(info)
    }
}
