//! Rule-based plan rewriter.
//!
//! Five rules run in a fixed order inside a fixed-point loop: predicate
//! pushdown, projection pushdown, filter fusion, limit pushdown and
//! constant folding. Each rule is a pure tree rewrite reporting whether it
//! changed anything; the loop stops when a full pass leaves the plan alone.

use crate::dataframe::join::JoinType;
use crate::expressions::{BinaryOperator, Expr};
use crate::lazy::LogicalPlan;
use crate::types::{promote_dtypes, DType, Scalar};
use log::debug;
use std::collections::BTreeSet;

const MAX_PASSES: usize = 64;

/// Rewrites `plan` to a fixed point of the rule set.
pub fn optimize(plan: LogicalPlan) -> LogicalPlan {
    let mut plan = plan;
    for pass in 0..MAX_PASSES {
        let mut fired = false;
        for (name, rule) in RULES {
            let (next, changed) = rule(plan);
            plan = next;
            if changed {
                debug!("optimizer pass {}: rule {} fired", pass, name);
                fired = true;
            }
        }
        if !fired {
            break;
        }
    }
    plan
}

type Rule = fn(LogicalPlan) -> (LogicalPlan, bool);

const RULES: [(&str, Rule); 5] = [
    ("predicate-pushdown", predicate_pushdown),
    ("projection-pushdown", projection_pushdown_root),
    ("filter-fusion", filter_fusion),
    ("limit-pushdown", limit_pushdown),
    ("constant-folding", constant_folding),
];

// ---------------------------------------------------------------------------
// Rule 1: predicate pushdown
// ---------------------------------------------------------------------------

/// True when every column the predicate reads passes through the projection
/// untouched (a bare column reference or part of `*`).
fn predicate_survives_projection(predicate: &Expr, exprs: &[Expr]) -> bool {
    let has_all_cols = exprs.iter().any(|e| matches!(e, Expr::AllCols));
    let passthrough: Vec<&str> = exprs
        .iter()
        .filter_map(|e| match e {
            Expr::Column(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    // A computed column shadowing an input name would change what the
    // predicate sees below the projection.
    let shadowed: Vec<String> = exprs
        .iter()
        .filter(|e| !matches!(e, Expr::Column(_) | Expr::AllCols))
        .filter_map(|e| e.output_name())
        .collect();
    predicate.root_columns().iter().all(|col| {
        !shadowed.iter().any(|s| s == col)
            && (has_all_cols || passthrough.contains(&col.as_str()))
    })
}

fn split_conjuncts(expr: Expr, out: &mut Vec<Expr>) {
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::And,
            left,
            right,
        } => {
            split_conjuncts(*left, out);
            split_conjuncts(*right, out);
        }
        other => out.push(other),
    }
}

fn conjoin(mut conjuncts: Vec<Expr>) -> Option<Expr> {
    let first = if conjuncts.is_empty() {
        return None;
    } else {
        conjuncts.remove(0)
    };
    Some(conjuncts.into_iter().fold(first, |acc, e| acc.and(e)))
}

fn predicate_pushdown(plan: LogicalPlan) -> (LogicalPlan, bool) {
    match plan {
        LogicalPlan::Filter { input, predicate } => {
            let (input, mut fired) = predicate_pushdown(*input);
            match input {
                LogicalPlan::Projection { input: proj_input, exprs }
                    if predicate_survives_projection(&predicate, &exprs) =>
                {
                    fired = true;
                    (
                        LogicalPlan::Projection {
                            input: Box::new(LogicalPlan::Filter {
                                input: proj_input,
                                predicate,
                            }),
                            exprs,
                        },
                        fired,
                    )
                }
                LogicalPlan::Join {
                    left,
                    right,
                    on,
                    how,
                    options,
                } => {
                    // Split on top-level And; a conjunct reading only one
                    // side's columns moves below the join, but only into a
                    // side whose rows the join preserves unconditionally.
                    let left_names: BTreeSet<String> = match left.schema() {
                        Ok(s) => s.names().into_iter().collect(),
                        Err(_) => BTreeSet::new(),
                    };
                    let right_names: BTreeSet<String> = match right.schema() {
                        Ok(s) => s.names().into_iter().collect(),
                        Err(_) => BTreeSet::new(),
                    };
                    let may_push_left = matches!(how, JoinType::Inner | JoinType::Left);
                    let may_push_right = matches!(how, JoinType::Inner | JoinType::Right);

                    let mut conjuncts = Vec::new();
                    split_conjuncts(predicate, &mut conjuncts);
                    let mut to_left = Vec::new();
                    let mut to_right = Vec::new();
                    let mut kept = Vec::new();
                    for conjunct in conjuncts {
                        let cols = conjunct.root_columns();
                        if may_push_left && !cols.is_empty()
                            && cols.iter().all(|c| left_names.contains(c))
                        {
                            to_left.push(conjunct);
                        } else if may_push_right && !cols.is_empty()
                            && cols.iter().all(|c| right_names.contains(c))
                        {
                            to_right.push(conjunct);
                        } else {
                            kept.push(conjunct);
                        }
                    }

                    if to_left.is_empty() && to_right.is_empty() {
                        let predicate = conjoin(kept).expect("kept all conjuncts");
                        return (
                            LogicalPlan::Filter {
                                input: Box::new(LogicalPlan::Join {
                                    left,
                                    right,
                                    on,
                                    how,
                                    options,
                                }),
                                predicate,
                            },
                            fired,
                        );
                    }

                    fired = true;
                    let left = match conjoin(to_left) {
                        Some(p) => Box::new(LogicalPlan::Filter {
                            input: left,
                            predicate: p,
                        }),
                        None => left,
                    };
                    let right = match conjoin(to_right) {
                        Some(p) => Box::new(LogicalPlan::Filter {
                            input: right,
                            predicate: p,
                        }),
                        None => right,
                    };
                    let join = LogicalPlan::Join {
                        left,
                        right,
                        on,
                        how,
                        options,
                    };
                    let plan = match conjoin(kept) {
                        Some(p) => LogicalPlan::Filter {
                            input: Box::new(join),
                            predicate: p,
                        },
                        None => join,
                    };
                    (plan, fired)
                }
                other => (
                    LogicalPlan::Filter {
                        input: Box::new(other),
                        predicate,
                    },
                    fired,
                ),
            }
        }
        other => map_children(other, predicate_pushdown),
    }
}

// ---------------------------------------------------------------------------
// Rule 2: projection pushdown
// ---------------------------------------------------------------------------

fn projection_pushdown_root(plan: LogicalPlan) -> (LogicalPlan, bool) {
    projection_pushdown(plan, None)
}

/// `demand` is the set of columns the nodes above still need; `None` means
/// everything.
fn projection_pushdown(
    plan: LogicalPlan,
    demand: Option<BTreeSet<String>>,
) -> (LogicalPlan, bool) {
    match plan {
        LogicalPlan::Scan {
            source,
            schema,
            projection,
        } => {
            let fired;
            let new_projection = match &demand {
                None => {
                    fired = false;
                    projection
                }
                Some(set) => {
                    let wanted: Vec<String> = schema
                        .names()
                        .into_iter()
                        .filter(|n| set.contains(n))
                        .collect();
                    // An empty demand set (literal-only projection) must not
                    // prune the scan to nothing: the frame height would go
                    // with it.
                    if wanted.is_empty() || wanted.len() == schema.len() {
                        fired = false;
                        projection
                    } else if projection.as_ref() == Some(&wanted) {
                        fired = false;
                        projection
                    } else {
                        fired = true;
                        Some(wanted)
                    }
                }
            };
            (
                LogicalPlan::Scan {
                    source,
                    schema,
                    projection: new_projection,
                },
                fired,
            )
        }
        LogicalPlan::Projection { input, exprs } => {
            let child_demand = if exprs.iter().any(|e| e.has_all_cols()) {
                None
            } else {
                Some(
                    exprs
                        .iter()
                        .flat_map(|e| e.root_columns())
                        .collect::<BTreeSet<String>>(),
                )
            };
            let (input, fired) = projection_pushdown(*input, child_demand);
            (
                LogicalPlan::Projection {
                    input: Box::new(input),
                    exprs,
                },
                fired,
            )
        }
        LogicalPlan::Filter { input, predicate } => {
            let child_demand = demand.map(|mut set| {
                set.extend(predicate.root_columns());
                set
            });
            let (input, fired) = projection_pushdown(*input, child_demand);
            (
                LogicalPlan::Filter {
                    input: Box::new(input),
                    predicate,
                },
                fired,
            )
        }
        LogicalPlan::GroupBy { input, keys, aggs } => {
            let mut needed: BTreeSet<String> = keys.iter().cloned().collect();
            for agg in &aggs {
                needed.extend(agg.root_columns());
            }
            let (input, fired) = projection_pushdown(*input, Some(needed));
            (
                LogicalPlan::GroupBy {
                    input: Box::new(input),
                    keys,
                    aggs,
                },
                fired,
            )
        }
        LogicalPlan::Join {
            left,
            right,
            on,
            how,
            options,
        } => {
            let (left_demand, right_demand) = match &demand {
                None => (None, None),
                Some(set) => {
                    let split = |side: &LogicalPlan| -> Option<BTreeSet<String>> {
                        match side.schema() {
                            Ok(schema) => {
                                let mut wanted: BTreeSet<String> = schema
                                    .names()
                                    .into_iter()
                                    .filter(|n| set.contains(n))
                                    .collect();
                                wanted.extend(on.iter().cloned());
                                Some(wanted)
                            }
                            Err(_) => None,
                        }
                    };
                    (split(&left), split(&right))
                }
            };
            let (left, f1) = projection_pushdown(*left, left_demand);
            let (right, f2) = projection_pushdown(*right, right_demand);
            (
                LogicalPlan::Join {
                    left: Box::new(left),
                    right: Box::new(right),
                    on,
                    how,
                    options,
                },
                f1 || f2,
            )
        }
        LogicalPlan::Sort {
            input,
            by,
            descending,
            top_k,
        } => {
            let child_demand = demand.map(|mut set| {
                set.extend(by.iter().cloned());
                set
            });
            let (input, fired) = projection_pushdown(*input, child_demand);
            (
                LogicalPlan::Sort {
                    input: Box::new(input),
                    by,
                    descending,
                    top_k,
                },
                fired,
            )
        }
        LogicalPlan::Limit { input, n } => {
            let (input, fired) = projection_pushdown(*input, demand);
            (LogicalPlan::Limit { input: Box::new(input), n }, fired)
        }
    }
}

// ---------------------------------------------------------------------------
// Rule 3: filter fusion
// ---------------------------------------------------------------------------

fn filter_fusion(plan: LogicalPlan) -> (LogicalPlan, bool) {
    match plan {
        LogicalPlan::Filter { input, predicate } => {
            let (input, fired) = filter_fusion(*input);
            match input {
                LogicalPlan::Filter {
                    input: inner,
                    predicate: inner_predicate,
                } => (
                    LogicalPlan::Filter {
                        input: inner,
                        predicate: inner_predicate.and(predicate),
                    },
                    true,
                ),
                other => (
                    LogicalPlan::Filter {
                        input: Box::new(other),
                        predicate,
                    },
                    fired,
                ),
            }
        }
        other => map_children(other, filter_fusion),
    }
}

// ---------------------------------------------------------------------------
// Rule 4: limit pushdown
// ---------------------------------------------------------------------------

fn limit_pushdown(plan: LogicalPlan) -> (LogicalPlan, bool) {
    match plan {
        LogicalPlan::Limit { input, n } => {
            let (input, fired) = limit_pushdown(*input);
            match input {
                // A projection without aggregations is row-for-row, so the
                // limit may run first.
                LogicalPlan::Projection { input: proj_input, exprs }
                    if !exprs.iter().any(|e| e.has_aggregation()) =>
                {
                    (
                        LogicalPlan::Projection {
                            input: Box::new(LogicalPlan::Limit {
                                input: proj_input,
                                n,
                            }),
                            exprs,
                        },
                        true,
                    )
                }
                // Limit over sort fuses into a top-k sort.
                LogicalPlan::Sort {
                    input: sort_input,
                    by,
                    descending,
                    top_k,
                } => (
                    LogicalPlan::Sort {
                        input: sort_input,
                        by,
                        descending,
                        top_k: Some(top_k.map_or(n, |k| k.min(n))),
                    },
                    true,
                ),
                other => (
                    LogicalPlan::Limit {
                        input: Box::new(other),
                        n,
                    },
                    fired,
                ),
            }
        }
        other => map_children(other, limit_pushdown),
    }
}

// ---------------------------------------------------------------------------
// Rule 5: constant folding
// ---------------------------------------------------------------------------

fn fold_expr(expr: Expr, fired: &mut bool) -> Expr {
    match expr {
        Expr::BinaryOp { op, left, right } => {
            let left = fold_expr(*left, fired);
            let right = fold_expr(*right, fired);
            if let (Expr::Literal(l), Expr::Literal(r)) = (&left, &right) {
                if let Some(folded) = eval_literal_binary(op, l, r) {
                    *fired = true;
                    return Expr::Literal(folded);
                }
            }
            Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        Expr::Aggregation { kind, expr } => Expr::Aggregation {
            kind,
            expr: Box::new(fold_expr(*expr, fired)),
        },
        Expr::Cast { expr, dtype } => Expr::Cast {
            expr: Box::new(fold_expr(*expr, fired)),
            dtype,
        },
        Expr::Alias { expr, name } => Expr::Alias {
            expr: Box::new(fold_expr(*expr, fired)),
            name,
        },
        leaf => leaf,
    }
}

/// Evaluates a binary op over two literals, if it is defined for them.
/// Anything that would error at runtime is left unfolded.
fn eval_literal_binary(op: BinaryOperator, left: &Scalar, right: &Scalar) -> Option<Scalar> {
    match op {
        BinaryOperator::And | BinaryOperator::Or => {
            let (l, r) = (left.as_bool()?, right.as_bool()?);
            Some(Scalar::Bool(if op == BinaryOperator::And {
                l && r
            } else {
                l || r
            }))
        }
        op if op.is_comparison() => {
            let ord = left.partial_cmp(right)?;
            let result = match op {
                BinaryOperator::Eq => ord == std::cmp::Ordering::Equal,
                BinaryOperator::Neq => ord != std::cmp::Ordering::Equal,
                BinaryOperator::Lt => ord == std::cmp::Ordering::Less,
                BinaryOperator::LtEq => ord != std::cmp::Ordering::Greater,
                BinaryOperator::Gt => ord == std::cmp::Ordering::Greater,
                BinaryOperator::GtEq => ord != std::cmp::Ordering::Less,
                _ => unreachable!(),
            };
            Some(Scalar::Bool(result))
        }
        _ => {
            let dtype = promote_dtypes(left.dtype(), right.dtype()).ok()?;
            if !dtype.is_numeric() {
                return None;
            }
            if dtype.is_float() {
                let (l, r) = (left.as_f64()?, right.as_f64()?);
                let v = match op {
                    BinaryOperator::Add => l + r,
                    BinaryOperator::Sub => l - r,
                    BinaryOperator::Mul => l * r,
                    BinaryOperator::Div => l / r,
                    BinaryOperator::Mod => l % r,
                    _ => unreachable!(),
                };
                Some(match dtype {
                    DType::F32 => Scalar::F32(v as f32),
                    _ => Scalar::F64(v),
                })
            } else if dtype.is_signed() {
                let (l, r) = (left.as_i64()?, right.as_i64()?);
                let v = match op {
                    BinaryOperator::Add => l.checked_add(r)?,
                    BinaryOperator::Sub => l.checked_sub(r)?,
                    BinaryOperator::Mul => l.checked_mul(r)?,
                    BinaryOperator::Div => l.checked_div(r)?,
                    BinaryOperator::Mod => l.checked_rem(r)?,
                    _ => unreachable!(),
                };
                Some(match dtype {
                    DType::I32 => Scalar::I32(v as i32),
                    _ => Scalar::I64(v),
                })
            } else {
                let as_u64 = |s: &Scalar| match s {
                    Scalar::U64(v) => Some(*v),
                    Scalar::U32(v) => Some(*v as u64),
                    Scalar::Bool(v) => Some(*v as u64),
                    _ => None,
                };
                let (l, r) = (as_u64(left)?, as_u64(right)?);
                let v = match op {
                    BinaryOperator::Add => l.checked_add(r)?,
                    BinaryOperator::Sub => l.checked_sub(r)?,
                    BinaryOperator::Mul => l.checked_mul(r)?,
                    BinaryOperator::Div => l.checked_div(r)?,
                    BinaryOperator::Mod => l.checked_rem(r)?,
                    _ => unreachable!(),
                };
                Some(match dtype {
                    DType::U32 => Scalar::U32(v as u32),
                    _ => Scalar::U64(v),
                })
            }
        }
    }
}

fn constant_folding(plan: LogicalPlan) -> (LogicalPlan, bool) {
    let mut fired = false;
    let plan = match plan {
        LogicalPlan::Filter { input, predicate } => {
            let (input, f) = constant_folding(*input);
            fired |= f;
            LogicalPlan::Filter {
                input: Box::new(input),
                predicate: fold_expr(predicate, &mut fired),
            }
        }
        LogicalPlan::Projection { input, exprs } => {
            let (input, f) = constant_folding(*input);
            fired |= f;
            LogicalPlan::Projection {
                input: Box::new(input),
                exprs: exprs
                    .into_iter()
                    .map(|e| fold_expr(e, &mut fired))
                    .collect(),
            }
        }
        LogicalPlan::GroupBy { input, keys, aggs } => {
            let (input, f) = constant_folding(*input);
            fired |= f;
            LogicalPlan::GroupBy {
                input: Box::new(input),
                keys,
                aggs: aggs.into_iter().map(|e| fold_expr(e, &mut fired)).collect(),
            }
        }
        other => {
            let (plan, f) = map_children(other, constant_folding);
            fired |= f;
            plan
        }
    };
    (plan, fired)
}

// ---------------------------------------------------------------------------
// Tree plumbing
// ---------------------------------------------------------------------------

/// Applies `rule` to every child of a node, rebuilding it.
fn map_children(plan: LogicalPlan, rule: Rule) -> (LogicalPlan, bool) {
    match plan {
        leaf @ LogicalPlan::Scan { .. } => (leaf, false),
        LogicalPlan::Filter { input, predicate } => {
            let (input, fired) = rule(*input);
            (
                LogicalPlan::Filter {
                    input: Box::new(input),
                    predicate,
                },
                fired,
            )
        }
        LogicalPlan::Projection { input, exprs } => {
            let (input, fired) = rule(*input);
            (
                LogicalPlan::Projection {
                    input: Box::new(input),
                    exprs,
                },
                fired,
            )
        }
        LogicalPlan::GroupBy { input, keys, aggs } => {
            let (input, fired) = rule(*input);
            (
                LogicalPlan::GroupBy {
                    input: Box::new(input),
                    keys,
                    aggs,
                },
                fired,
            )
        }
        LogicalPlan::Join {
            left,
            right,
            on,
            how,
            options,
        } => {
            let (left, f1) = rule(*left);
            let (right, f2) = rule(*right);
            (
                LogicalPlan::Join {
                    left: Box::new(left),
                    right: Box::new(right),
                    on,
                    how,
                    options,
                },
                f1 || f2,
            )
        }
        LogicalPlan::Sort {
            input,
            by,
            descending,
            top_k,
        } => {
            let (input, fired) = rule(*input);
            (
                LogicalPlan::Sort {
                    input: Box::new(input),
                    by,
                    descending,
                    top_k,
                },
                fired,
            )
        }
        LogicalPlan::Limit { input, n } => {
            let (input, fired) = rule(*input);
            (
                LogicalPlan::Limit {
                    input: Box::new(input),
                    n,
                },
                fired,
            )
        }
    }
}
