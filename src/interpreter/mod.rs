use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{AssignTarget, BinaryOp, Expr, Literal, Program, Stmt, UnaryOp};
use crate::modules::ModuleTable;

pub mod errors;
pub use errors::{ErrorCode, ScriptError};

/// A module's attribute dictionary with shared-handle semantics.
///
/// Cloning a `Namespace` clones the handle, not the contents; two handles
/// compare equal exactly when they alias the same dictionary.
#[derive(Clone)]
pub struct Namespace {
    entries: Rc<RefCell<HashMap<String, Value>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.entries.borrow_mut().insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn ptr_eq(a: &Namespace, b: &Namespace) -> bool {
        Rc::ptr_eq(&a.entries, &b.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Attribute names in sorted order, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        Namespace::ptr_eq(self, other)
    }
}

// Namespaces can alias each other through module attributes, so Debug prints
// only the attribute names to stay cycle-safe.
impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({:?})", self.names())
    }
}

/// Runtime value types of the cell dialect.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        module: Namespace,
    },
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, RuntimeError>,
    },
    Module(Namespace),
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Bool(a), Bool(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Module(a), Module(b)) => Namespace::ptr_eq(a, b),
            (NativeFunction { func: a, .. }, NativeFunction { func: b, .. }) => a == b,
            (Null, Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => {
                write!(f, "{{")?;
                for (i, (key, val)) in obj.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            Value::Function { name, .. } => write!(f, "<function {}>", name),
            Value::NativeFunction { name, .. } => write!(f, "<native function {}>", name),
            Value::Module(_) => write!(f, "<module>"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function { .. } => "function",
            Value::NativeFunction { .. } => "native_function",
            Value::Module(_) => "module",
            Value::Null => "null",
        }
    }
}

/// Runtime errors raised while executing a fragment.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    VariableNotFound(String),
    AttributeNotFound { target: String, attribute: String },
    ModuleNotFound(String),
    TypeError(String),
    ArgumentError(String),
    IndexError(String),
    DivisionByZero,
    StackOverflow,
    Return(Value),
    Break,
    Continue,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::VariableNotFound(name) => write!(f, "Variable '{}' not found", name),
            RuntimeError::AttributeNotFound { target, attribute } => {
                write!(f, "{} has no attribute '{}'", target, attribute)
            }
            RuntimeError::ModuleNotFound(name) => write!(f, "No module named '{}'", name),
            RuntimeError::TypeError(msg) => write!(f, "Type error: {}", msg),
            RuntimeError::ArgumentError(msg) => write!(f, "Argument error: {}", msg),
            RuntimeError::IndexError(msg) => write!(f, "Index error: {}", msg),
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::StackOverflow => write!(f, "Stack overflow"),
            RuntimeError::Return(val) => write!(f, "Return outside function: {}", val),
            RuntimeError::Break => write!(f, "Break statement outside loop"),
            RuntimeError::Continue => write!(f, "Continue statement outside loop"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        errors::runtime_error_code(self).as_str()
    }
}

/// Tree-walking evaluator executing fragments against module namespaces.
///
/// The module table is an injected shared handle; `import` resolves against
/// it and nothing else.
pub struct Interpreter {
    modules: ModuleTable,
    builtins: HashMap<&'static str, Value>,
    module: Namespace,
    scopes: Vec<HashMap<String, Value>>,
    call_stack: Vec<String>,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_modules(ModuleTable::new())
    }

    /// Build an interpreter around an injected module table handle.
    pub fn with_modules(modules: ModuleTable) -> Self {
        let mut interpreter = Self {
            modules,
            builtins: HashMap::new(),
            module: Namespace::new(),
            scopes: Vec::new(),
            call_stack: Vec::new(),
            max_call_depth: 1000,
        };
        interpreter.init_builtins();
        interpreter
    }

    pub fn modules(&self) -> ModuleTable {
        self.modules.clone()
    }

    fn init_builtins(&mut self) {
        self.register_builtin("print", 1, |args| {
            println!("{}", args[0]);
            Ok(Value::Null)
        });
        self.register_builtin("len", 1, |args| {
            let length = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(arr) => arr.len(),
                Value::Object(obj) => obj.len(),
                other => {
                    return Err(RuntimeError::TypeError(format!(
                        "len() not supported for {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(length as i64))
        });
        self.register_builtin("type", 1, |args| {
            Ok(Value::String(args[0].type_name().to_string()))
        });
        self.register_builtin("str", 1, |args| Ok(Value::String(args[0].to_string())));
    }

    fn register_builtin(
        &mut self,
        name: &'static str,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, RuntimeError>,
    ) {
        self.builtins
            .insert(name, Value::NativeFunction { name, arity, func });
    }

    /// Execute a fragment with `namespace` as both the global and local
    /// execution context. Returns the value of the last expression
    /// statement, if any.
    pub fn eval_fragment(
        &mut self,
        namespace: &Namespace,
        program: &Program,
    ) -> Result<Option<Value>, RuntimeError> {
        let saved_module = std::mem::replace(&mut self.module, namespace.clone());
        let saved_scopes = std::mem::take(&mut self.scopes);
        let result = self.eval_statements(&program.statements);
        self.module = saved_module;
        self.scopes = saved_scopes;
        match result {
            Ok(last) => Ok(last),
            Err(RuntimeError::Return(value)) => Ok(Some(value)),
            Err(error) => Err(error),
        }
    }

    fn eval_statements(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        let mut last = None;
        for stmt in statements {
            last = self.eval_stmt(stmt)?;
        }
        Ok(last)
    }

    fn eval_scoped(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        self.scopes.push(HashMap::new());
        let result = self.eval_statements(statements);
        self.scopes.pop();
        result
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Option<Value>, RuntimeError> {
        match stmt {
            Stmt::VariableDecl {
                name, initializer, ..
            } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                self.define_variable(name, value);
                Ok(None)
            }

            Stmt::FunctionDecl {
                name, params, body, ..
            } => {
                let func = Value::Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    module: self.module.clone(),
                };
                self.define_variable(name, func);
                Ok(None)
            }

            Stmt::Expression { expr } => {
                let value = self.eval_expr(expr)?;
                // Assignments are statements for echo purposes.
                if matches!(expr, Expr::Assignment { .. }) {
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }

            Stmt::Import { path, .. } => {
                self.execute_import(path)?;
                Ok(None)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_scoped(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.eval_scoped(else_branch)?;
                }
                Ok(None)
            }

            Stmt::While {
                condition, body, ..
            } => {
                loop {
                    if !self.eval_expr(condition)?.is_truthy() {
                        break;
                    }
                    match self.eval_scoped(body) {
                        Ok(_) => {}
                        Err(RuntimeError::Break) => break,
                        Err(RuntimeError::Continue) => continue,
                        Err(error) => return Err(error),
                    }
                }
                Ok(None)
            }

            Stmt::For {
                variable,
                iterable,
                body,
                ..
            } => {
                let iterable = self.eval_expr(iterable)?;
                let items = match iterable {
                    Value::Array(items) => items,
                    other => {
                        return Err(RuntimeError::TypeError(format!(
                            "Value of type '{}' is not iterable",
                            other.type_name()
                        )))
                    }
                };
                for item in items {
                    self.scopes.push(HashMap::new());
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(variable.clone(), item);
                    }
                    let result = self.eval_statements(body);
                    self.scopes.pop();
                    match result {
                        Ok(_) => {}
                        Err(RuntimeError::Break) => break,
                        Err(RuntimeError::Continue) => continue,
                        Err(error) => return Err(error),
                    }
                }
                Ok(None)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Err(RuntimeError::Return(value))
            }

            Stmt::Break { .. } => Err(RuntimeError::Break),
            Stmt::Continue { .. } => Err(RuntimeError::Continue),
        }
    }

    fn execute_import(&mut self, path: &[String]) -> Result<(), RuntimeError> {
        let full_name = path.join(".");
        if self.modules.lookup(&full_name).is_none() {
            return Err(RuntimeError::ModuleNotFound(full_name));
        }
        // `import a.b.c` binds the top-level package, like the module system
        // it mirrors; nested access then walks the linked attributes.
        let top = &path[0];
        let namespace = self
            .modules
            .lookup(top)
            .ok_or_else(|| RuntimeError::ModuleNotFound(top.clone()))?;
        self.define_variable(top, Value::Module(namespace));
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => self.eval_literal(value),

            Expr::Identifier { name, .. } => self
                .lookup_variable(name)
                .ok_or_else(|| RuntimeError::VariableNotFound(name.clone())),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => match operator {
                // Logical operators short-circuit.
                BinaryOp::And => {
                    let l = self.eval_expr(left)?;
                    if !l.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let r = self.eval_expr(right)?;
                    Ok(Value::Bool(r.is_truthy()))
                }
                BinaryOp::Or => {
                    let l = self.eval_expr(left)?;
                    if l.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let r = self.eval_expr(right)?;
                    Ok(Value::Bool(r.is_truthy()))
                }
                _ => {
                    let l = self.eval_expr(left)?;
                    let r = self.eval_expr(right)?;
                    eval_binary_op(operator, l, r)
                }
            },

            Expr::Unary {
                operator, operand, ..
            } => {
                let value = self.eval_expr(operand)?;
                eval_unary_op(operator, value)
            }

            Expr::Assignment { target, value, .. } => {
                let value = self.eval_expr(value)?;
                match target {
                    AssignTarget::Variable(name) => self.assign_variable(name, value.clone()),
                    AssignTarget::Member { object, property } => {
                        self.store_member(object, property, value.clone())?
                    }
                    AssignTarget::Index { object, index } => {
                        self.store_index(object, index, value.clone())?
                    }
                }
                Ok(value)
            }

            Expr::Call { callee, args, .. } => {
                let func = self.eval_expr(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                self.call_function(func, arg_values)
            }

            Expr::Index { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                eval_index_access(object, index)
            }

            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object)?;
                match object {
                    Value::Module(namespace) => {
                        namespace
                            .get(property)
                            .ok_or_else(|| RuntimeError::AttributeNotFound {
                                target: "module".to_string(),
                                attribute: property.clone(),
                            })
                    }
                    Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
                    other => Err(RuntimeError::TypeError(format!(
                        "Cannot access property '{}' on {}",
                        property,
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn eval_literal(&mut self, literal: &Literal) -> Result<Value, RuntimeError> {
        match literal {
            Literal::Integer(n) => Ok(Value::Int(*n)),
            Literal::Float(f) => Ok(Value::Float(*f)),
            Literal::Boolean(b) => Ok(Value::Bool(*b)),
            Literal::String(s) => Ok(Value::String(s.clone())),
            Literal::Null => Ok(Value::Null),
            Literal::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for expr in elements {
                    values.push(self.eval_expr(expr)?);
                }
                Ok(Value::Array(values))
            }
            Literal::Object(fields) => {
                let mut map = HashMap::new();
                for (key, expr) in fields {
                    let value = self.eval_expr(expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn call_function(&mut self, func: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if self.call_stack.len() >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow);
        }

        match func {
            Value::NativeFunction { name, arity, func } => {
                if args.len() != arity {
                    return Err(RuntimeError::ArgumentError(format!(
                        "Function '{}' expects {} arguments, got {}",
                        name,
                        arity,
                        args.len()
                    )));
                }
                func(&args)
            }

            Value::Function {
                name,
                params,
                body,
                module,
            } => {
                if args.len() != params.len() {
                    return Err(RuntimeError::ArgumentError(format!(
                        "Function '{}' expects {} arguments, got {}",
                        name,
                        params.len(),
                        args.len()
                    )));
                }

                self.call_stack.push(name);

                // The callee runs against its defining module's namespace,
                // with one fresh local scope holding the parameters.
                let saved_module = std::mem::replace(&mut self.module, module);
                let saved_scopes = std::mem::take(&mut self.scopes);
                let mut params_scope = HashMap::new();
                for (param, arg) in params.into_iter().zip(args) {
                    params_scope.insert(param, arg);
                }
                self.scopes.push(params_scope);

                let result = self.eval_statements(&body);

                self.module = saved_module;
                self.scopes = saved_scopes;
                self.call_stack.pop();

                match result {
                    Ok(_) => Ok(Value::Null),
                    Err(RuntimeError::Return(value)) => Ok(value),
                    Err(error) => Err(error),
                }
            }

            other => Err(RuntimeError::TypeError(format!(
                "Value of type '{}' is not callable",
                other.type_name()
            ))),
        }
    }

    //=============================================
    // Variable resolution
    //=============================================

    fn lookup_variable(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.module.get(name) {
            return Some(value);
        }
        self.builtins.get(name).cloned()
    }

    /// Assign to an existing binding, or define at the current level when
    /// the name is new. Module-level assignments land in the module's own
    /// dictionary and stay visible to later fragments.
    fn assign_variable(&mut self, name: &str, value: Value) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), value);
                return;
            }
        }
        if self.module.contains(name) {
            self.module.set(name, value);
            return;
        }
        self.define_variable(name, value);
    }

    fn define_variable(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        } else {
            self.module.set(name, value);
        }
    }

    //=============================================
    // Lvalue stores
    //=============================================

    fn store_member(
        &mut self,
        object: &Expr,
        property: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let target = self.eval_expr(object)?;
        match target {
            // Module attributes have reference semantics through the shared
            // namespace handle, so no write-back is needed.
            Value::Module(namespace) => {
                namespace.set(property, value);
                Ok(())
            }
            Value::Object(mut map) => {
                map.insert(property.to_string(), value);
                self.write_back(object, Value::Object(map))
            }
            other => Err(RuntimeError::TypeError(format!(
                "Cannot assign property '{}' on {}",
                property,
                other.type_name()
            ))),
        }
    }

    fn store_index(
        &mut self,
        object: &Expr,
        index: &Expr,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let target = self.eval_expr(object)?;
        let index = self.eval_expr(index)?;
        match (target, index) {
            (Value::Array(mut items), Value::Int(idx)) => {
                let i = if idx < 0 {
                    items.len() as i64 + idx
                } else {
                    idx
                };
                if i < 0 || i >= items.len() as i64 {
                    return Err(RuntimeError::IndexError(format!(
                        "Index {} out of bounds",
                        idx
                    )));
                }
                items[i as usize] = value;
                self.write_back(object, Value::Array(items))
            }
            (Value::Object(mut map), Value::String(key)) => {
                map.insert(key, value);
                self.write_back(object, Value::Object(map))
            }
            (target, index) => Err(RuntimeError::TypeError(format!(
                "Cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }

    fn write_back(&mut self, expr: &Expr, value: Value) -> Result<(), RuntimeError> {
        match expr {
            Expr::Identifier { name, .. } => {
                self.assign_variable(name, value);
                Ok(())
            }
            Expr::Member {
                object, property, ..
            } => self.store_member(object, property, value),
            Expr::Index { object, index, .. } => self.store_index(object, index, value),
            other => Err(RuntimeError::TypeError(format!(
                "Invalid assignment target at line {}",
                other.position().line
            ))),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

//=============================================
// Operator evaluation
//=============================================

fn eval_binary_op(op: &BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;
    use Value::*;
    match op {
        Add => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a + b)),
            (Float(a), Float(b)) => Ok(Float(a + b)),
            (Int(a), Float(b)) => Ok(Float(a as f64 + b)),
            (Float(a), Int(b)) => Ok(Float(a + b as f64)),
            (String(a), String(b)) => Ok(String(a + &b)),
            (String(a), b) => Ok(String(a + &b.to_string())),
            (a, String(b)) => Ok(String(a.to_string() + &b)),
            (a, b) => Err(type_mismatch("Add", &a, &b)),
        },
        Subtract => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a - b)),
            (Float(a), Float(b)) => Ok(Float(a - b)),
            (Int(a), Float(b)) => Ok(Float(a as f64 - b)),
            (Float(a), Int(b)) => Ok(Float(a - b as f64)),
            (a, b) => Err(type_mismatch("Subtract", &a, &b)),
        },
        Multiply => match (left, right) {
            (Int(a), Int(b)) => Ok(Int(a * b)),
            (Float(a), Float(b)) => Ok(Float(a * b)),
            (Int(a), Float(b)) => Ok(Float(a as f64 * b)),
            (Float(a), Int(b)) => Ok(Float(a * b as f64)),
            (a, b) => Err(type_mismatch("Multiply", &a, &b)),
        },
        Divide => match (left, right) {
            (_, Int(0)) => Err(RuntimeError::DivisionByZero),
            (_, Float(b)) if b == 0.0 => Err(RuntimeError::DivisionByZero),
            (Int(a), Int(b)) => Ok(Int(a / b)),
            (Float(a), Float(b)) => Ok(Float(a / b)),
            (Int(a), Float(b)) => Ok(Float(a as f64 / b)),
            (Float(a), Int(b)) => Ok(Float(a / b as f64)),
            (a, b) => Err(type_mismatch("Divide", &a, &b)),
        },
        Modulo => match (left, right) {
            (_, Int(0)) => Err(RuntimeError::DivisionByZero),
            (Int(a), Int(b)) => Ok(Int(a % b)),
            (a, b) => Err(type_mismatch("Modulo", &a, &b)),
        },
        Equal => Ok(Bool(left == right)),
        NotEqual => Ok(Bool(left != right)),
        Less => compare(left, right, "Less", |ord| ord == std::cmp::Ordering::Less),
        Greater => compare(left, right, "Greater", |ord| {
            ord == std::cmp::Ordering::Greater
        }),
        LessEqual => compare(left, right, "LessEqual", |ord| {
            ord != std::cmp::Ordering::Greater
        }),
        GreaterEqual => compare(left, right, "GreaterEqual", |ord| {
            ord != std::cmp::Ordering::Less
        }),
        And | Or => Err(RuntimeError::TypeError(
            "logical operator outside short-circuit evaluation".to_string(),
        )),
    }
}

fn compare(
    left: Value,
    right: Value,
    op: &str,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    use Value::*;
    let ordering = match (&left, &right) {
        (Int(a), Int(b)) => a.partial_cmp(b),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
        (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
        (String(a), String(b)) => a.partial_cmp(b),
        _ => None,
    };
    match ordering {
        Some(ord) => Ok(Value::Bool(accept(ord))),
        None => Err(type_mismatch(op, &left, &right)),
    }
}

fn eval_unary_op(op: &UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    use Value::*;
    match (op, operand) {
        (UnaryOp::Minus, Int(n)) => Ok(Int(-n)),
        (UnaryOp::Minus, Float(f)) => Ok(Float(-f)),
        (UnaryOp::Not, value) => Ok(Bool(!value.is_truthy())),
        (UnaryOp::Minus, value) => Err(RuntimeError::TypeError(format!(
            "Unary minus not supported for {}",
            value.type_name()
        ))),
    }
}

fn eval_index_access(object: Value, index: Value) -> Result<Value, RuntimeError> {
    match (object, index) {
        (Value::Array(arr), Value::Int(idx)) => {
            let i = if idx < 0 { arr.len() as i64 + idx } else { idx };
            if i < 0 || i >= arr.len() as i64 {
                Err(RuntimeError::IndexError(format!(
                    "Index {} out of bounds",
                    idx
                )))
            } else {
                Ok(arr[i as usize].clone())
            }
        }
        (Value::Object(obj), Value::String(key)) => {
            Ok(obj.get(&key).cloned().unwrap_or(Value::Null))
        }
        (Value::String(s), Value::Int(idx)) => {
            let chars: Vec<char> = s.chars().collect();
            let i = if idx < 0 {
                chars.len() as i64 + idx
            } else {
                idx
            };
            if i < 0 || i >= chars.len() as i64 {
                Err(RuntimeError::IndexError(format!(
                    "Index {} out of bounds",
                    idx
                )))
            } else {
                Ok(Value::String(chars[i as usize].to_string()))
            }
        }
        (obj, idx) => Err(RuntimeError::TypeError(format!(
            "Cannot index {} with {}",
            obj.type_name(),
            idx.type_name()
        ))),
    }
}

fn type_mismatch(op: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "{} not supported for {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::tokenizer::Tokenizer;

    fn run(interpreter: &mut Interpreter, ns: &Namespace, source: &str) -> Option<Value> {
        let mut tokenizer = Tokenizer::new(source);
        let tokens = tokenizer.tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        interpreter.eval_fragment(ns, &program).unwrap()
    }

    #[test]
    fn module_scope_accumulates_across_fragments() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        run(&mut interpreter, &ns, "x = 1");
        run(&mut interpreter, &ns, "x += 1");
        assert_eq!(ns.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn functions_capture_their_defining_namespace() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        run(&mut interpreter, &ns, "base = 10\nfn shifted(n) { return base + n }");
        // Call from a different namespace; the function still sees `base`.
        let shell = Namespace::new();
        shell.set("m", Value::Module(ns.clone()));
        let result = run(&mut interpreter, &shell, "m.shifted(5)");
        assert_eq!(result, Some(Value::Int(15)));
    }

    #[test]
    fn locals_do_not_leak_into_module_namespace() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        run(
            &mut interpreter,
            &ns,
            "fn f() { let tmp = 1; return tmp }\nresult = f()",
        );
        assert_eq!(ns.get("result"), Some(Value::Int(1)));
        assert!(!ns.contains("tmp"));
    }

    #[test]
    fn import_binds_top_level_module() {
        let table = ModuleTable::new();
        let leaf = table.ensure("pkg.sub");
        leaf.set("y", Value::Int(5));
        table.ensure("pkg");
        table.link_ancestors("pkg.sub");

        let mut interpreter = Interpreter::with_modules(table);
        let shell = Namespace::new();
        let result = run(&mut interpreter, &shell, "import pkg.sub\npkg.sub.y");
        assert_eq!(result, Some(Value::Int(5)));
        assert!(shell.contains("pkg"));
    }

    #[test]
    fn missing_import_raises_module_not_found() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        let mut tokenizer = Tokenizer::new("import nowhere");
        let tokens = tokenizer.tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let err = interpreter.eval_fragment(&ns, &program).unwrap_err();
        assert!(matches!(err, RuntimeError::ModuleNotFound(name) if name == "nowhere"));
    }

    #[test]
    fn runtime_error_leaves_earlier_definitions_in_place() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        let mut tokenizer = Tokenizer::new("a = 1\nb = missing + 1");
        let tokens = tokenizer.tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let err = interpreter.eval_fragment(&ns, &program).unwrap_err();
        assert!(matches!(err, RuntimeError::VariableNotFound(_)));
        // Partial mutation is surfaced, not rolled back.
        assert_eq!(ns.get("a"), Some(Value::Int(1)));
        assert!(!ns.contains("b"));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        let mut tokenizer = Tokenizer::new("1 / 0");
        let tokens = tokenizer.tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let err = interpreter.eval_fragment(&ns, &program).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero));
    }

    #[test]
    fn while_loop_with_break() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        run(
            &mut interpreter,
            &ns,
            "total = 0\nn = 0\nwhile true { n += 1; if n > 3 { break }; total += n }",
        );
        assert_eq!(ns.get("total"), Some(Value::Int(6)));
    }

    #[test]
    fn array_index_assignment_writes_back() {
        let mut interpreter = Interpreter::new();
        let ns = Namespace::new();
        run(&mut interpreter, &ns, "arr = [1, 2, 3]\narr[1] = 20");
        assert_eq!(
            ns.get("arr"),
            Some(Value::Array(vec![
                Value::Int(1),
                Value::Int(20),
                Value::Int(3)
            ]))
        );
    }
}
