//! IR construction helpers for the integration tests.

use matvm::ir::{
    BinaryOp, Expr, ExprKind, Function, FunctionId, NodeIdGen, Program, Stmt, StmtKind, StmtSeq,
    Symbol,
};

/// Builds IR nodes with fresh ids.
#[derive(Default)]
pub struct IrBuilder {
    gen: NodeIdGen,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.gen.fresh(),
            kind,
        }
    }

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.gen.fresh(),
            kind,
        }
    }

    pub fn sym(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Symbol(name.to_string()))
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::IntConst(value))
    }

    pub fn fp(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::FpConst(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::StrConst(value.to_string()))
    }

    pub fn binop(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn matrix(&mut self, rows: Vec<Vec<Expr>>) -> Expr {
        self.expr(ExprKind::Matrix { rows })
    }

    pub fn cell_array(&mut self, rows: Vec<Vec<Expr>>) -> Expr {
        self.expr(ExprKind::CellArray { rows })
    }

    pub fn fn_handle(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::FnHandle(name.to_string()))
    }

    pub fn dot(&mut self, inner: Expr, field: &str) -> Expr {
        self.expr(ExprKind::Dot {
            expr: Box::new(inner),
            field: field.to_string(),
        })
    }

    pub fn param(&mut self, sym: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Param {
            sym: sym.to_string(),
            args,
        })
    }

    pub fn cell_index(&mut self, sym: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::CellIndex {
            sym: sym.to_string(),
            args,
        })
    }

    /// `name = rhs`
    pub fn assign(&mut self, name: &str, rhs: Expr) -> Stmt {
        let lv = self.sym(name);
        self.assign_to(lv, rhs)
    }

    /// `lv = rhs` for an arbitrary lvalue expression.
    pub fn assign_to(&mut self, lv: Expr, rhs: Expr) -> Stmt {
        self.stmt(StmtKind::Assign {
            lhs: vec![lv],
            rhs,
        })
    }

    pub fn expr_stmt(&mut self, e: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(e))
    }

    pub fn if_else(&mut self, cond: Expr, then_stmts: Vec<Stmt>, else_stmts: Vec<Stmt>) -> Stmt {
        let then_seq = self.seq(then_stmts);
        let else_seq = self.seq(else_stmts);
        self.stmt(StmtKind::IfElse {
            cond,
            then_seq,
            else_seq,
        })
    }

    /// `while` shape: empty init and incr sections.
    pub fn while_loop(&mut self, test_stmts: Vec<Stmt>, body_stmts: Vec<Stmt>) -> Stmt {
        let init = self.seq(vec![]);
        let test = self.seq(test_stmts);
        let body = self.seq(body_stmts);
        let incr = self.seq(vec![]);
        self.stmt(StmtKind::Loop {
            init,
            test,
            body,
            incr,
        })
    }

    pub fn ret(&mut self) -> Stmt {
        self.stmt(StmtKind::Return)
    }

    pub fn brk(&mut self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn seq(&mut self, stmts: Vec<Stmt>) -> StmtSeq {
        StmtSeq {
            id: self.gen.fresh(),
            stmts,
        }
    }

    /// Adds a function with the given body to `program`.
    pub fn function(
        &mut self,
        program: &mut Program,
        name: &str,
        in_params: &[&str],
        out_params: &[&str],
        stmts: Vec<Stmt>,
    ) -> FunctionId {
        let body = self.seq(stmts);
        program.add_function(Function {
            name: name.to_string(),
            in_params: in_params.iter().map(|s| s.to_string()).collect(),
            out_params: out_params.iter().map(|s| s.to_string()).collect(),
            body,
            parent: None,
        })
    }
}

/// The body of a function added through [`IrBuilder::function`].
pub fn body_of(program: &Program, fid: FunctionId) -> &matvm::ir::StmtSeq {
    &program.function(fid).body
}

#[allow(dead_code)]
pub fn symbol(name: &str) -> Symbol {
    name.to_string()
}
