//! Core interpreter implementation

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fnforge_core::ast::{
    Argument, ArrayElement, AssignOp, BinaryOp, DeclKind, Entry, Expr, FunctionBody, LogicalOp,
    MemberProperty, Pattern, Program, Property, Stmt, SwitchCase, UnaryOp, UpdateOp,
    IMPLICIT_PARAM,
};
use tracing::trace;

use crate::builtins::{self, MAX_ARRAY_LENGTH, MAX_STRING_LENGTH};
use crate::environment::{Environment, ScopeRegistry};
use crate::error::{
    range_error, reference_error, throw, type_error, Abrupt, BindingError, ControlFlow,
    EvalResult, InterpreterError, InterpreterResult,
};
use crate::value::{Closure, FunctionKind, FunctionValue, Value};

/// Default thread stack for isolated runs
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Interpreter options
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Evaluation steps (statements, expressions, calls) before aborting
    pub max_steps: u64,
    /// Maximum nesting of candidate function calls
    pub max_recursion_depth: usize,
    /// Wall-clock budget for one run
    pub timeout: Option<Duration>,
    /// Stack size of the thread used by isolated runs
    pub stack_size: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_recursion_depth: 512,
            timeout: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// A resolved assignment target
enum Reference {
    Binding(String),
    Property { object: Value, key: Value },
}

/// How a pattern introduces its names
#[derive(Clone, Copy)]
enum BindMode {
    Declare(DeclKind),
    Define,
}

/// Tree-walking interpreter for candidate programs
pub struct Interpreter {
    global_env: Environment,
    options: InterpreterOptions,
    steps: u64,
    recursion_depth: usize,
    start_time: Instant,
    scopes: ScopeRegistry,
}

impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        let global_env = Environment::new();
        builtins::install(&global_env);

        let mut scopes = ScopeRegistry::new();
        scopes.register(&global_env);

        Self {
            global_env,
            options,
            steps: 0,
            recursion_depth: 0,
            start_time: Instant::now(),
            scopes,
        }
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Steps consumed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn global_env(&self) -> &Environment {
        &self.global_env
    }

    /// Run the program and apply its entry function to `input`
    pub fn call_entry(&mut self, program: &Program, input: Value) -> InterpreterResult<Value> {
        self.start_time = Instant::now();
        let entry = program.entry();
        trace!(?entry, "calling entry");

        let result = match entry {
            Entry::Body => self.run_body(program, input),
            Entry::Function { name, .. } | Entry::Binding { name } => {
                self.run_top_level(program).and_then(|_| {
                    let callee = self.global_env.lookup(&name).unwrap_or(Value::Undefined);
                    if !matches!(callee, Value::Function(_)) {
                        return Err(Abrupt::Error(InterpreterError::InvalidEntry(format!(
                            "'{}' is {}, not a function",
                            name,
                            callee.type_of()
                        ))));
                    }
                    self.call_function(&callee, Value::Undefined, &[input])
                })
            }
        };

        result.map_err(uncaught)
    }

    /// Execute the top-level statements, stopping at a top-level `return`
    pub fn run_top_level(&mut self, program: &Program) -> EvalResult<Value> {
        let env = self.global_env.clone();
        let stmts: Vec<Stmt> = program.statements().cloned().collect();
        self.run_function_body(&stmts, &env)
    }

    /// Call any function value from outside the evaluator
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> InterpreterResult<Value> {
        self.call_function(callee, Value::Undefined, args)
            .map_err(uncaught)
    }

    fn run_body(&mut self, program: &Program, input: Value) -> EvalResult<Value> {
        let global = self.global_env.clone();
        let env = self.function_scope(&global);
        env.define(IMPLICIT_PARAM, input);
        let stmts: Vec<Stmt> = program.statements().cloned().collect();
        self.run_function_body(&stmts, &env)
    }

    fn run_function_body(&mut self, stmts: &[Stmt], env: &Environment) -> EvalResult<Value> {
        hoist_vars(stmts, env);
        self.hoist_functions(stmts, env);

        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                ControlFlow::Normal => {}
                ControlFlow::Return(value) => return Ok(value),
                ControlFlow::Break(_) => return Err(InterpreterError::BreakOutsideLoop.into()),
                ControlFlow::Continue(_) => {
                    return Err(InterpreterError::ContinueOutsideLoop.into())
                }
            }
        }
        Ok(Value::Undefined)
    }

    // ----- resource accounting -----

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.options.max_steps {
            return Err(InterpreterError::StepLimitExceeded(self.options.max_steps).into());
        }
        if self.steps % 1024 == 0 {
            if let Some(timeout) = self.options.timeout {
                if self.start_time.elapsed() > timeout {
                    return Err(InterpreterError::Timeout(timeout).into());
                }
            }
        }
        Ok(())
    }

    fn block_scope(&mut self, parent: &Environment) -> Environment {
        let env = parent.extend();
        self.scopes.register(&env);
        env
    }

    fn function_scope(&mut self, parent: &Environment) -> Environment {
        let env = Environment::function_scope(parent.clone());
        self.scopes.register(&env);
        env
    }

    fn fork_scope(&mut self, env: &Environment) -> Environment {
        let forked = env.fork();
        self.scopes.register(&forked);
        forked
    }

    pub fn check_array_length(&self, len: usize) -> EvalResult<()> {
        if len > MAX_ARRAY_LENGTH {
            return range_error("Invalid array length");
        }
        Ok(())
    }

    pub fn check_string_length(&self, len: usize) -> EvalResult<()> {
        if len > MAX_STRING_LENGTH {
            return range_error("Invalid string length");
        }
        Ok(())
    }

    // ----- statements -----

    fn hoist_functions(&mut self, stmts: &[Stmt], env: &Environment) {
        for stmt in stmts {
            if let Stmt::FunctionDecl(function) = stmt {
                if let Some(name) = &function.name {
                    env.define(name, Value::closure(function.clone(), env.clone()));
                }
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &Environment) -> EvalResult<ControlFlow> {
        let scope = self.block_scope(env);
        self.exec_statements(stmts, &scope)
    }

    fn exec_statements(&mut self, stmts: &[Stmt], env: &Environment) -> EvalResult<ControlFlow> {
        self.hoist_functions(stmts, env);
        for stmt in stmts {
            let flow = self.exec_stmt(stmt, env)?;
            if !matches!(flow, ControlFlow::Normal) {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Environment) -> EvalResult<ControlFlow> {
        self.tick()?;

        match stmt {
            Stmt::Expr(expr) => {
                self.eval_expr(expr, env)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::VarDecl { kind, declarations } => {
                for declarator in declarations {
                    match (&declarator.init, &declarator.pattern, kind) {
                        (None, Pattern::Ident(name), DeclKind::Var) => env.declare_var(name, None),
                        (init, pattern, kind) => {
                            let value = match init {
                                Some(init) => self.eval_expr(init, env)?,
                                None => Value::Undefined,
                            };
                            self.bind_pattern(pattern, value, env, BindMode::Declare(*kind))?;
                        }
                    }
                }
                Ok(ControlFlow::Normal)
            }
            // hoisted when the enclosing body was entered
            Stmt::FunctionDecl(_) => Ok(ControlFlow::Normal),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    self.exec_stmt(consequent, env)
                } else if let Some(alternate) = alternate {
                    self.exec_stmt(alternate, env)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_block(stmts, env),
            Stmt::For { .. }
            | Stmt::ForOf { .. }
            | Stmt::ForIn { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. } => self.exec_loop(stmt, None, env),
            Stmt::Labeled { label, body } => {
                let flow = if is_loop(body) {
                    self.exec_loop(body, Some(label.as_str()), env)?
                } else {
                    self.exec_stmt(body, env)?
                };
                match flow {
                    ControlFlow::Break(Some(target)) if target == *label => Ok(ControlFlow::Normal),
                    flow => Ok(flow),
                }
            }
            Stmt::Break(label) => Ok(ControlFlow::Break(label.clone())),
            Stmt::Continue(label) => Ok(ControlFlow::Continue(label.clone())),
            Stmt::Throw(expr) => {
                let value = self.eval_expr(expr, env)?;
                Err(Abrupt::Throw(value))
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(block, env);

                if let (Err(Abrupt::Throw(exception)), Some(handler)) = (&result, handler) {
                    let exception = exception.clone();
                    let scope = self.block_scope(env);
                    result = match &handler.param {
                        Some(param) => self
                            .bind_pattern(param, exception, &scope, BindMode::Define)
                            .and_then(|_| self.exec_statements(&handler.body, &scope)),
                        None => self.exec_statements(&handler.body, &scope),
                    };
                }

                if let Some(finalizer) = finalizer {
                    match self.exec_block(finalizer, env)? {
                        ControlFlow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                result
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.exec_switch(discriminant, cases, env),
            Stmt::Empty => Ok(ControlFlow::Normal),
        }
    }

    /// Run a loop statement. `label` names the labeled statement wrapping
    /// it, so `break label` and `continue label` land here.
    fn exec_loop(
        &mut self,
        stmt: &Stmt,
        label: Option<&str>,
        env: &Environment,
    ) -> EvalResult<ControlFlow> {
        match stmt {
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_deref(), test.as_ref(), update.as_ref(), body, label, env),
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                let iterable = self.eval_expr(iterable, env)?;
                let items = self.iterate(&iterable)?;
                self.exec_for_each(items, *kind, pattern, body, label, env)
            }
            Stmt::ForIn {
                kind,
                pattern,
                object,
                body,
            } => {
                let object = self.eval_expr(object, env)?;
                let keys = builtins::object::own_keys(&object)
                    .into_iter()
                    .map(Value::from)
                    .collect();
                self.exec_for_each(keys, *kind, pattern, body, label, env)
            }
            Stmt::While { test, body } => {
                loop {
                    self.tick()?;
                    if !self.eval_expr(test, env)?.is_truthy() {
                        break;
                    }
                    match loop_step(self.exec_stmt(body, env)?, label) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    self.tick()?;
                    match loop_step(self.exec_stmt(body, env)?, label) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                    if !self.eval_expr(test, env)?.is_truthy() {
                        break;
                    }
                }
                Ok(ControlFlow::Normal)
            }
            other => self.exec_stmt(other, env),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        label: Option<&str>,
        env: &Environment,
    ) -> EvalResult<ControlFlow> {
        let loop_env = self.block_scope(env);
        let per_iteration = matches!(
            init,
            Some(Stmt::VarDecl {
                kind: DeclKind::Let | DeclKind::Const,
                ..
            })
        );

        if let Some(init) = init {
            self.exec_stmt(init, &loop_env)?;
        }

        let mut iteration_env = loop_env;
        loop {
            self.tick()?;
            if let Some(test) = test {
                if !self.eval_expr(test, &iteration_env)?.is_truthy() {
                    break;
                }
            }

            match loop_step(self.exec_stmt(body, &iteration_env)?, label) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }

            if per_iteration {
                iteration_env = self.fork_scope(&iteration_env);
            }
            if let Some(update) = update {
                self.eval_expr(update, &iteration_env)?;
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_for_each(
        &mut self,
        items: Vec<Value>,
        kind: DeclKind,
        pattern: &Pattern,
        body: &Stmt,
        label: Option<&str>,
        env: &Environment,
    ) -> EvalResult<ControlFlow> {
        for item in items {
            self.tick()?;
            let iteration_env = self.block_scope(env);
            self.bind_pattern(pattern, item, &iteration_env, BindMode::Declare(kind))?;

            match loop_step(self.exec_stmt(body, &iteration_env)?, label) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
        env: &Environment,
    ) -> EvalResult<ControlFlow> {
        let value = self.eval_expr(discriminant, env)?;
        let scope = self.block_scope(env);
        for case in cases {
            self.hoist_functions(&case.body, &scope);
        }

        let mut start = None;
        for (index, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval_expr(test, &scope)?.strict_equals(&value) {
                    start = Some(index);
                    break;
                }
            }
        }
        let start = match start.or_else(|| cases.iter().position(|case| case.test.is_none())) {
            Some(start) => start,
            None => return Ok(ControlFlow::Normal),
        };

        for case in &cases[start..] {
            for stmt in &case.body {
                match self.exec_stmt(stmt, &scope)? {
                    ControlFlow::Normal => {}
                    ControlFlow::Break(None) => return Ok(ControlFlow::Normal),
                    flow => return Ok(flow),
                }
            }
        }
        Ok(ControlFlow::Normal)
    }

    // ----- patterns -----

    fn bind_name(
        &mut self,
        name: &str,
        value: Value,
        env: &Environment,
        mode: BindMode,
    ) -> EvalResult<()> {
        match mode {
            BindMode::Declare(kind) => env.declare(name, value, kind).or_else(binding_error),
            BindMode::Define => {
                env.define(name, value);
                Ok(())
            }
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        env: &Environment,
        mode: BindMode,
    ) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name) => self.bind_name(name, value, env, mode),
            Pattern::Array { elements, rest } => {
                let items = self.iterate(&value)?;
                for (index, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let mut item = items.get(index).cloned().unwrap_or(Value::Undefined);
                    if let (Value::Undefined, Some(default)) = (&item, &element.default) {
                        item = self.eval_expr(default, env)?;
                    }
                    self.bind_pattern(&element.pattern, item, env, mode)?;
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elements.len()..).unwrap_or_default().to_vec();
                    self.bind_pattern(rest, Value::array(remaining), env, mode)?;
                }
                Ok(())
            }
            Pattern::Object { properties, rest } => {
                if value.is_nullish() {
                    return type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    ));
                }
                for property in properties {
                    let mut item = self.get_property(&value, &property.key)?;
                    if let (Value::Undefined, Some(default)) = (&item, &property.default) {
                        item = self.eval_expr(default, env)?;
                    }
                    self.bind_pattern(&property.value, item, env, mode)?;
                }
                if let Some(rest) = rest {
                    let taken: Vec<&str> = properties.iter().map(|p| p.key.as_str()).collect();
                    let remaining = self.rest_properties(&value, &taken)?;
                    self.bind_name(rest, remaining, env, mode)?;
                }
                Ok(())
            }
        }
    }

    fn rest_properties(&mut self, value: &Value, taken: &[&str]) -> EvalResult<Value> {
        let mut remaining = IndexMap::new();
        for key in builtins::object::own_keys(value) {
            if !taken.contains(&key.as_str()) {
                let item = self.get_property(value, &key)?;
                remaining.insert(key, item);
            }
        }
        Ok(Value::object(remaining))
    }

    /// Assignment through an array or object literal used as a target
    fn destructure_assign(
        &mut self,
        target: &Expr,
        value: Value,
        env: &Environment,
    ) -> EvalResult<()> {
        match target {
            Expr::Array(elements) => {
                let items = self.iterate(&value)?;
                for (index, element) in elements.iter().enumerate() {
                    match element {
                        ArrayElement::Expr(expr) => {
                            let item = items.get(index).cloned().unwrap_or(Value::Undefined);
                            self.assign_target(expr, item, env)?;
                        }
                        ArrayElement::Spread(expr) => {
                            let remaining = items.get(index..).unwrap_or_default().to_vec();
                            self.assign_target(expr, Value::array(remaining), env)?;
                            break;
                        }
                        ArrayElement::Hole => {}
                    }
                }
                Ok(())
            }
            Expr::Object(properties) => {
                if value.is_nullish() {
                    return type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    ));
                }
                let mut taken = Vec::new();
                for property in properties {
                    match property {
                        Property::KeyValue(key, expr) => {
                            let item = self.get_property(&value, key)?;
                            taken.push(key.clone());
                            self.assign_target(expr, item, env)?;
                        }
                        Property::Computed(key, expr) => {
                            let key = self.eval_expr(key, env)?.to_property_key();
                            let item = self.get_property(&value, &key)?;
                            taken.push(key);
                            self.assign_target(expr, item, env)?;
                        }
                        Property::Spread(expr) => {
                            let taken: Vec<&str> = taken.iter().map(String::as_str).collect();
                            let remaining = self.rest_properties(&value, &taken)?;
                            self.assign_target(expr, remaining, env)?;
                        }
                    }
                }
                Ok(())
            }
            other => {
                let reference = self.eval_reference(other, env)?;
                self.put_reference(&reference, value, env)
            }
        }
    }

    /// One element of a destructuring assignment, honouring `= default`
    fn assign_target(&mut self, target: &Expr, value: Value, env: &Environment) -> EvalResult<()> {
        match target {
            Expr::Assign {
                op: AssignOp::Assign,
                target,
                value: default,
            } => {
                let value = match value {
                    Value::Undefined => self.eval_expr(default, env)?,
                    value => value,
                };
                self.assign_target(target, value, env)
            }
            Expr::Array(_) | Expr::Object(_) => self.destructure_assign(target, value, env),
            other => {
                let reference = self.eval_reference(other, env)?;
                self.put_reference(&reference, value, env)
            }
        }
    }

    // ----- references -----

    fn eval_reference(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Reference> {
        match expr {
            Expr::Ident(name) => Ok(Reference::Binding(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object, env)?;
                let key = match property {
                    MemberProperty::Named(name) => Value::string(name.as_str()),
                    MemberProperty::Computed(expr) => self.eval_expr(expr, env)?,
                };
                Ok(Reference::Property { object, key })
            }
            other => throw(
                "SyntaxError",
                format!("Invalid assignment target: {}", other.kind_name()),
            ),
        }
    }

    fn get_reference(&mut self, reference: &Reference, env: &Environment) -> EvalResult<Value> {
        match reference {
            Reference::Binding(name) => self.lookup(name, env),
            Reference::Property { object, key } => self.get_indexed(object, key),
        }
    }

    fn put_reference(
        &mut self,
        reference: &Reference,
        value: Value,
        env: &Environment,
    ) -> EvalResult<()> {
        match reference {
            Reference::Binding(name) => match env.assign(name, value.clone()) {
                Ok(()) => Ok(()),
                // sloppy-mode assignment creates a global
                Err(BindingError::Undefined(_)) => {
                    env.root().define(name, value);
                    Ok(())
                }
                Err(err) => binding_error(err),
            },
            Reference::Property { object, key } => self.set_indexed(object, key, value),
        }
    }

    fn lookup(&mut self, name: &str, env: &Environment) -> EvalResult<Value> {
        match env.lookup(name) {
            Some(value) => Ok(value),
            None if name == "this" || name == "undefined" => Ok(Value::Undefined),
            None => reference_error(format!("{} is not defined", name)),
        }
    }

    // ----- expressions -----

    pub(crate) fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        self.tick()?;

        match expr {
            Expr::Literal(lit) => Ok(Value::from_literal(lit)),
            Expr::Ident(name) => self.lookup(name, env),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(index) {
                        let value = self.eval_expr(expr, env)?;
                        out.push_str(&value.to_js_string());
                        self.check_string_length(out.len())?;
                    }
                }
                Ok(Value::from(out))
            }
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        ArrayElement::Expr(expr) => items.push(self.eval_expr(expr, env)?),
                        ArrayElement::Spread(expr) => {
                            let value = self.eval_expr(expr, env)?;
                            items.extend(self.iterate(&value)?);
                            self.check_array_length(items.len())?;
                        }
                        ArrayElement::Hole => items.push(Value::Undefined),
                    }
                }
                Ok(Value::array(items))
            }
            Expr::Object(properties) => {
                let mut map = IndexMap::new();
                for property in properties {
                    match property {
                        Property::KeyValue(key, expr) => {
                            let value = self.eval_expr(expr, env)?;
                            map.insert(key.clone(), value);
                        }
                        Property::Computed(key, expr) => {
                            let key = self.eval_expr(key, env)?.to_property_key();
                            let value = self.eval_expr(expr, env)?;
                            map.insert(key, value);
                        }
                        Property::Spread(expr) => {
                            let source = self.eval_expr(expr, env)?;
                            for key in builtins::object::own_keys(&source) {
                                let value = self.get_property(&source, &key)?;
                                map.insert(key, value);
                            }
                        }
                    }
                }
                Ok(Value::object(map))
            }
            Expr::Function(function) => Ok(Value::closure(function.clone(), env.clone())),
            Expr::Unary { op, arg } => self.eval_unary(*op, arg, env),
            Expr::Update { op, prefix, target } => {
                let reference = self.eval_reference(target, env)?;
                let old = self.get_reference(&reference, env)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_reference(&reference, Value::Number(new), env)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                self.binary_op(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval_expr(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval_expr(right, env)
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, env),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    self.eval_expr(consequent, env)
                } else {
                    self.eval_expr(alternate, env)
                }
            }
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or(Value::Undefined))
            }
            Expr::New { callee, args } => {
                let constructor = self.eval_expr(callee, env)?;
                let args = self.eval_arguments(args, env)?;
                self.construct(&constructor, &args, callee)
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval_expr(expr, env)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, arg: &Expr, env: &Environment) -> EvalResult<Value> {
        match op {
            UnaryOp::TypeOf => {
                if let Expr::Ident(name) = arg {
                    if env.lookup(name).is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                let value = self.eval_expr(arg, env)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOp::Delete => {
                if let Expr::Member {
                    object, property, ..
                } = arg
                {
                    let object = self.eval_expr(object, env)?;
                    let key = match property {
                        MemberProperty::Named(name) => name.clone(),
                        MemberProperty::Computed(expr) => {
                            self.eval_expr(expr, env)?.to_property_key()
                        }
                    };
                    self.delete_property(&object, &key)?;
                }
                Ok(Value::Boolean(true))
            }
            _ => {
                let value = self.eval_expr(arg, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Minus => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::BitNot => Value::Number(f64::from(!value.to_int32())),
                    _ => Value::Undefined,
                })
            }
        }
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        env: &Environment,
    ) -> EvalResult<Value> {
        if op == AssignOp::Assign && matches!(target, Expr::Array(_) | Expr::Object(_)) {
            let value = self.eval_expr(value, env)?;
            self.destructure_assign(target, value.clone(), env)?;
            return Ok(value);
        }

        let reference = self.eval_reference(target, env)?;
        let result = match op {
            AssignOp::Assign => self.eval_expr(value, env)?,
            AssignOp::And | AssignOp::Or | AssignOp::Nullish => {
                let current = self.get_reference(&reference, env)?;
                let keep = match op {
                    AssignOp::And => !current.is_truthy(),
                    AssignOp::Or => current.is_truthy(),
                    _ => !current.is_nullish(),
                };
                if keep {
                    return Ok(current);
                }
                self.eval_expr(value, env)?
            }
            compound => {
                let current = self.get_reference(&reference, env)?;
                let operand = self.eval_expr(value, env)?;
                match compound.binary_op() {
                    Some(binary) => self.binary_op(binary, &current, &operand)?,
                    None => operand,
                }
            }
        };

        self.put_reference(&reference, result.clone(), env)?;
        Ok(result)
    }

    /// Evaluate a member/call chain. `None` means an optional link
    /// short-circuited and the whole chain is `undefined`.
    fn eval_chain(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(object) = self.eval_chain_link(object, env)? else {
                    return Ok(None);
                };
                if *optional && object.is_nullish() {
                    return Ok(None);
                }
                let key = match property {
                    MemberProperty::Named(name) => Value::string(name.as_str()),
                    MemberProperty::Computed(expr) => self.eval_expr(expr, env)?,
                };
                self.get_indexed(&object, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let (this, function) = match &**callee {
                    Expr::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        let Some(object) = self.eval_chain_link(object, env)? else {
                            return Ok(None);
                        };
                        if *member_optional && object.is_nullish() {
                            return Ok(None);
                        }
                        let key = match property {
                            MemberProperty::Named(name) => Value::string(name.as_str()),
                            MemberProperty::Computed(expr) => self.eval_expr(expr, env)?,
                        };
                        let function = self.get_indexed(&object, &key)?;
                        (object, function)
                    }
                    other => {
                        let Some(function) = self.eval_chain_link(other, env)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, function)
                    }
                };

                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                if !matches!(function, Value::Function(_)) {
                    return type_error(format!("{} is not a function", describe_expr(callee)));
                }

                let args = self.eval_arguments(args, env)?;
                self.call_function(&function, this, &args).map(Some)
            }
            other => self.eval_expr(other, env).map(Some),
        }
    }

    fn eval_chain_link(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Option<Value>> {
        match expr {
            Expr::Member { .. } | Expr::Call { .. } => self.eval_chain(expr, env),
            other => self.eval_expr(other, env).map(Some),
        }
    }

    fn eval_arguments(&mut self, args: &[Argument], env: &Environment) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(expr) => values.push(self.eval_expr(expr, env)?),
                Argument::Spread(expr) => {
                    let value = self.eval_expr(expr, env)?;
                    values.extend(self.iterate(&value)?);
                    self.check_array_length(values.len())?;
                }
            }
        }
        Ok(values)
    }

    // ----- operators -----

    pub(crate) fn binary_op(&mut self, op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
        let number = |n: f64| Ok(Value::Number(n));

        match op {
            BinaryOp::Add => {
                let left = to_primitive(left);
                let right = to_primitive(right);
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                    let mut out = left.to_js_string();
                    out.push_str(&right.to_js_string());
                    self.check_string_length(out.len())?;
                    Ok(Value::from(out))
                } else {
                    number(left.to_number() + right.to_number())
                }
            }
            BinaryOp::Sub => number(left.to_number() - right.to_number()),
            BinaryOp::Mul => number(left.to_number() * right.to_number()),
            BinaryOp::Div => number(left.to_number() / right.to_number()),
            BinaryOp::Rem => number(left.to_number() % right.to_number()),
            BinaryOp::Pow => number(js_pow(left.to_number(), right.to_number())),
            BinaryOp::Eq => Ok(Value::Boolean(left.loose_equals(right))),
            BinaryOp::NotEq => Ok(Value::Boolean(!left.loose_equals(right))),
            BinaryOp::StrictEq => Ok(Value::Boolean(left.strict_equals(right))),
            BinaryOp::StrictNotEq => Ok(Value::Boolean(!left.strict_equals(right))),
            BinaryOp::Lt => Ok(Value::Boolean(compare(left, right) == Some(Ordering::Less))),
            BinaryOp::Gt => Ok(Value::Boolean(compare(left, right) == Some(Ordering::Greater))),
            BinaryOp::LtEq => Ok(Value::Boolean(matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ))),
            BinaryOp::GtEq => Ok(Value::Boolean(matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ))),
            BinaryOp::BitAnd => number(f64::from(left.to_int32() & right.to_int32())),
            BinaryOp::BitOr => number(f64::from(left.to_int32() | right.to_int32())),
            BinaryOp::BitXor => number(f64::from(left.to_int32() ^ right.to_int32())),
            BinaryOp::Shl => number(f64::from(
                left.to_int32().wrapping_shl(right.to_uint32() & 31),
            )),
            BinaryOp::Shr => number(f64::from(
                left.to_int32().wrapping_shr(right.to_uint32() & 31),
            )),
            BinaryOp::UShr => number(f64::from(
                left.to_uint32().wrapping_shr(right.to_uint32() & 31),
            )),
            BinaryOp::In => {
                let key = left.to_property_key();
                let found = match right {
                    Value::Object(obj) => obj.borrow().properties.contains_key(&key),
                    Value::Array(items) => {
                        key == "length"
                            || array_index(&key).is_some_and(|i| i < items.borrow().len())
                    }
                    Value::Function(f) => f.properties.borrow().contains_key(&key),
                    Value::Set(_) | Value::Map(_) => key == "size",
                    other => {
                        return type_error(format!(
                            "Cannot use 'in' operator to search for '{}' in {}",
                            key,
                            other.to_js_string()
                        ))
                    }
                };
                Ok(Value::Boolean(found))
            }
            BinaryOp::InstanceOf => {
                let Value::Function(constructor) = right else {
                    return type_error("Right-hand side of 'instanceof' is not callable");
                };
                Ok(Value::Boolean(builtins::instance_of(left, constructor)))
            }
        }
    }

    // ----- calls -----

    /// Call a function value with an explicit receiver
    pub fn call_function(&mut self, callee: &Value, this: Value, args: &[Value]) -> EvalResult<Value> {
        let Value::Function(function) = callee else {
            return type_error(format!("{} is not a function", callee.inspect()));
        };

        match &function.kind {
            FunctionKind::Native(native) => {
                let this = native.receiver.clone().unwrap_or(this);
                (native.func)(self, &this, args)
            }
            FunctionKind::Closure(closure) => self.call_closure(function, closure, this, args),
        }
    }

    fn call_closure(
        &mut self,
        callee: &Rc<FunctionValue>,
        closure: &Closure,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        if self.recursion_depth >= self.options.max_recursion_depth {
            return Err(InterpreterError::StackOverflow(self.options.max_recursion_depth).into());
        }
        self.tick()?;

        self.recursion_depth += 1;
        let result = self.invoke_closure(callee, closure, this, args);
        self.recursion_depth -= 1;
        result
    }

    fn invoke_closure(
        &mut self,
        callee: &Rc<FunctionValue>,
        closure: &Closure,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        let function = &closure.function;
        let env = self.function_scope(&closure.env);

        if !function.is_arrow {
            if let Some(name) = &function.name {
                env.define(name, Value::Function(callee.clone()));
            }
            env.define("this", this);
            env.define("arguments", Value::array(args.to_vec()));
        }

        for (index, param) in function.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(index..).unwrap_or_default().to_vec())
            } else {
                match (args.get(index), &param.default) {
                    (None | Some(Value::Undefined), Some(default)) => {
                        self.eval_expr(default, &env)?
                    }
                    (Some(value), _) => value.clone(),
                    (None, None) => Value::Undefined,
                }
            };
            self.bind_pattern(&param.pattern, value, &env, BindMode::Define)?;
        }

        match &function.body {
            FunctionBody::Block(stmts) => self.run_function_body(stmts, &env),
            FunctionBody::Expr(expr) => self.eval_expr(expr, &env),
        }
    }

    fn construct(&mut self, constructor: &Value, args: &[Value], callee: &Expr) -> EvalResult<Value> {
        let Value::Function(function) = constructor else {
            return type_error(format!("{} is not a constructor", describe_expr(callee)));
        };

        match &function.kind {
            FunctionKind::Native(_) => self.call_function(constructor, Value::Undefined, args),
            FunctionKind::Closure(closure) => {
                if closure.function.is_arrow {
                    return type_error(format!("{} is not a constructor", describe_expr(callee)));
                }
                let instance = Value::object(IndexMap::new());
                let result = self.call_function(constructor, instance.clone(), args)?;
                Ok(match result {
                    Value::Array(_)
                    | Value::Object(_)
                    | Value::Function(_)
                    | Value::Set(_)
                    | Value::Map(_) => result,
                    _ => instance,
                })
            }
        }
    }

    // ----- properties -----

    /// Values produced by spreading or `for...of`
    pub fn iterate(&mut self, value: &Value) -> EvalResult<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Set(items) => Ok(items.borrow().clone()),
            Value::Map(entries) => Ok(entries
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
                .collect()),
            other => type_error(format!("{} is not iterable", describe_value(other))),
        }
    }

    /// Property read with a key of any type
    pub fn get_indexed(&mut self, object: &Value, key: &Value) -> EvalResult<Value> {
        if let (Value::Array(items), Some(index)) = (object, number_index(key)) {
            return Ok(items.borrow().get(index).cloned().unwrap_or(Value::Undefined));
        }
        self.get_property(object, &key.to_property_key())
    }

    /// Property read
    pub fn get_property(&mut self, object: &Value, key: &str) -> EvalResult<Value> {
        match object {
            Value::Undefined | Value::Null => type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                key
            )),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                if let Some(index) = array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::from(c.to_string()))
                        .unwrap_or(Value::Undefined));
                }
                Ok(bound_method(builtins::string::method(key), object))
            }
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                if let Some(index) = array_index(key) {
                    return Ok(items.borrow().get(index).cloned().unwrap_or(Value::Undefined));
                }
                Ok(bound_method(builtins::array::method(key), object))
            }
            Value::Object(obj) => {
                if let Some(value) = obj.borrow().properties.get(key) {
                    return Ok(value.clone());
                }
                Ok(bound_method(builtins::object::method(key), object))
            }
            Value::Function(function) => {
                if let Some(value) = function.properties.borrow().get(key) {
                    return Ok(value.clone());
                }
                Ok(match key {
                    "name" => Value::from(function.name()),
                    "length" => match &function.kind {
                        FunctionKind::Closure(closure) => Value::Number(
                            closure.function.params.iter().filter(|p| !p.rest).count() as f64,
                        ),
                        FunctionKind::Native(_) => Value::Number(0.0),
                    },
                    _ => Value::Undefined,
                })
            }
            Value::Number(_) => Ok(bound_method(builtins::number::method(key), object)),
            Value::Boolean(_) => Ok(bound_method(builtins::object::method(key), object)),
            Value::Set(items) => {
                if key == "size" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                Ok(bound_method(builtins::collections::set_method(key), object))
            }
            Value::Map(entries) => {
                if key == "size" {
                    return Ok(Value::Number(entries.borrow().len() as f64));
                }
                Ok(bound_method(builtins::collections::map_method(key), object))
            }
        }
    }

    /// Property write with a key of any type
    pub fn set_indexed(&mut self, object: &Value, key: &Value, value: Value) -> EvalResult<()> {
        if let (Value::Array(_), Some(index)) = (object, number_index(key)) {
            return self.set_array_index(object, index, value);
        }
        self.set_property(object, &key.to_property_key(), value)
    }

    /// Property write
    pub fn set_property(&mut self, object: &Value, key: &str, value: Value) -> EvalResult<()> {
        match object {
            Value::Undefined | Value::Null => type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_js_string(),
                key
            )),
            Value::Array(items) => {
                if key == "length" {
                    let len = value.to_number();
                    if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                        return range_error("Invalid array length");
                    }
                    let len = len as usize;
                    self.check_array_length(len)?;
                    items.borrow_mut().resize(len, Value::Undefined);
                    return Ok(());
                }
                if let Some(index) = array_index(key) {
                    return self.set_array_index(object, index, value);
                }
                Ok(())
            }
            Value::Object(obj) => {
                obj.borrow_mut().properties.insert(key.to_string(), value);
                Ok(())
            }
            Value::Function(function) => {
                function
                    .properties
                    .borrow_mut()
                    .insert(key.to_string(), value);
                Ok(())
            }
            // primitives and collections silently ignore writes
            _ => Ok(()),
        }
    }

    fn set_array_index(&mut self, array: &Value, index: usize, value: Value) -> EvalResult<()> {
        let Value::Array(items) = array else {
            return Ok(());
        };
        let mut items = items.borrow_mut();
        if index >= items.len() {
            self.check_array_length(index + 1)?;
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    fn delete_property(&mut self, object: &Value, key: &str) -> EvalResult<()> {
        match object {
            Value::Undefined | Value::Null => type_error(format!(
                "Cannot convert {} to object",
                object.to_js_string()
            )),
            Value::Object(obj) => {
                obj.borrow_mut().properties.shift_remove(key);
                Ok(())
            }
            Value::Array(items) => {
                if let Some(index) = array_index(key) {
                    if let Some(slot) = items.borrow_mut().get_mut(index) {
                        *slot = Value::Undefined;
                    }
                }
                Ok(())
            }
            Value::Function(function) => {
                function.properties.borrow_mut().shift_remove(key);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.scopes.release();
        self.global_env.clear();
    }
}

/// Turn an abrupt completion escaping the run into an error
fn uncaught(abrupt: Abrupt) -> InterpreterError {
    match abrupt {
        Abrupt::Throw(value) => {
            let rendered = match &value {
                Value::Object(obj) if obj.borrow().is_error => value.to_js_string(),
                other => other.inspect(),
            };
            InterpreterError::Uncaught(rendered)
        }
        Abrupt::Error(err) => err,
    }
}

fn binding_error<T>(err: BindingError) -> EvalResult<T> {
    match err {
        BindingError::AlreadyDeclared(_) => throw("SyntaxError", err.to_string()),
        BindingError::ConstAssignment(_) => type_error(err.to_string()),
        BindingError::Undefined(_) => reference_error(err.to_string()),
    }
}

fn bound_method(method: Option<(&'static str, crate::value::NativeFn)>, receiver: &Value) -> Value {
    match method {
        Some((name, func)) => Value::method(name, func, receiver),
        None => Value::Undefined,
    }
}

/// Declare every `var` of a function body up front
fn hoist_vars(stmts: &[Stmt], env: &Environment) {
    for stmt in stmts {
        hoist_var_stmt(stmt, env);
    }
}

fn hoist_var_stmt(stmt: &Stmt, env: &Environment) {
    match stmt {
        Stmt::VarDecl {
            kind: DeclKind::Var,
            declarations,
        } => {
            for declarator in declarations {
                for name in declarator.pattern.bound_names() {
                    env.declare_var(&name, None);
                }
            }
        }
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            hoist_var_stmt(consequent, env);
            if let Some(alternate) = alternate {
                hoist_var_stmt(alternate, env);
            }
        }
        Stmt::Block(stmts) => hoist_vars(stmts, env),
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                hoist_var_stmt(init, env);
            }
            hoist_var_stmt(body, env);
        }
        Stmt::ForOf {
            kind, pattern, body, ..
        }
        | Stmt::ForIn {
            kind, pattern, body, ..
        } => {
            if *kind == DeclKind::Var {
                for name in pattern.bound_names() {
                    env.declare_var(&name, None);
                }
            }
            hoist_var_stmt(body, env);
        }
        Stmt::While { body, .. }
        | Stmt::DoWhile { body, .. }
        | Stmt::Labeled { body, .. } => hoist_var_stmt(body, env),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            hoist_vars(block, env);
            if let Some(handler) = handler {
                hoist_vars(&handler.body, env);
            }
            if let Some(finalizer) = finalizer {
                hoist_vars(finalizer, env);
            }
        }
        Stmt::Switch { cases, .. } => {
            for case in cases {
                hoist_vars(&case.body, env);
            }
        }
        _ => {}
    }
}

fn is_loop(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::For { .. }
            | Stmt::ForOf { .. }
            | Stmt::ForIn { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. }
    )
}

/// What a loop does with the completion of one pass over its body
enum LoopStep {
    Next,
    Exit,
    Propagate(ControlFlow),
}

fn loop_step(flow: ControlFlow, label: Option<&str>) -> LoopStep {
    match flow {
        ControlFlow::Normal | ControlFlow::Continue(None) => LoopStep::Next,
        ControlFlow::Break(None) => LoopStep::Exit,
        ControlFlow::Continue(Some(target)) if label == Some(target.as_str()) => LoopStep::Next,
        ControlFlow::Break(Some(target)) if label == Some(target.as_str()) => LoopStep::Exit,
        flow => LoopStep::Propagate(flow),
    }
}

fn to_primitive(value: &Value) -> Value {
    if value.is_primitive() {
        value.clone()
    } else {
        Value::from(value.to_js_string())
    }
}

/// Abstract relational comparison; `None` when either side is NaN
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// Canonical array index text ("0", "17", not "01" or "1.5")
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn number_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < MAX_ARRAY_LENGTH as f64 => {
            Some(*n as usize)
        }
        _ => None,
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => value.to_js_string(),
        Value::Function(_) => value.inspect(),
        other => format!("{} {}", other.type_of(), other.inspect()),
    }
}

/// Source-like rendering of a callee for error messages
fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property: MemberProperty::Named(name),
            ..
        } => format!("{}.{}", describe_expr(object), name),
        Expr::Member { object, .. } => format!("{}[...]", describe_expr(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe_expr(callee)),
        other => other.kind_name().to_string(),
    }
}
