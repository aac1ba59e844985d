use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::callable::{self, Function};
use crate::class::Class;
use crate::environment::{self, EnvRef, Environment};
use crate::error::WagagoError;
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::module::Module;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non‑local exits out of statement execution.
#[derive(Error, Debug)]
pub enum InterpretError {
    /// A fault; unwinds to the top‑level driver.
    #[error(transparent)]
    Runtime(#[from] WagagoError),

    /// `return`; consumed by the nearest function call frame.
    #[error("Return signal with value: {0}")]
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Binding distances recorded by the resolver, keyed by node identity.
    /// Entries are never evicted: closures from earlier REPL lines may
    /// still evaluate the nodes they refer to.
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `output`.  Native
    /// functions such as `clock` are defined in the global scope.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().shared();

        debug!("Defining native function 'clock'");
        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(Rc::new(callable::clock())));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Called by the resolver for every reference bound to a local scope.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Recording {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// The distance recorded for `id`, if it is a local reference.
    pub fn local_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program").  The first fault stops
    /// the remaining statements; effects already performed stay.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), WagagoError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(InterpretError::Runtime(e)) => {
                    debug!("Runtime fault: {}", e);
                    // The fault is what gets reported; a flush failure on
                    // top of it is only logged.
                    if let Err(flush_err) = self.output.flush() {
                        debug!("Flushing output after fault failed: {}", flush_err);
                    }
                    return Err(e);
                }
                // Ruled out by the resolver.
                Err(InterpretError::Return(_)) => {
                    return Err(WagagoError::Runtime {
                        message: "Can't return from top-level code.".to_string(),
                        line: 0,
                    });
                }
            }
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Run `statements` inside `env`, restoring the previous environment on
    /// every exit path, including returns and faults.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<()> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);

        let result: IResult<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;
        result
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value).map_err(WagagoError::from)?;
                debug!("Printed value: {}", value);
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Variable '{}' defined with value: {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let env: EnvRef =
                    Environment::with_enclosing(Rc::clone(&self.environment)).shared();
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function =
                    Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Err(InterpretError::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),

            Stmt::Import { name, members } => {
                debug!("Defining module '{}'", name.lexeme);
                let members: HashMap<String, Rc<Function>> = members
                    .iter()
                    .map(|decl| {
                        let function =
                            Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();
                let module = Module::new(name.lexeme.clone(), members);
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Module(Rc::new(module)));
                Ok(())
            }
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        // Declared first so methods can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(WagagoError::runtime(at, "Superclass must be a class.").into());
                }
            },
            None => None,
        };

        let method_env: EnvRef = match &superclass {
            Some(superclass) => {
                let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                env.define("super", Value::Class(Rc::clone(superclass)));
                env.shared()
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let is_initializer: bool = decl.name.lexeme == "init";
                let function =
                    Function::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(name.lexeme.clone(), superclass, methods);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.local_depth(*id) {
                    Some(distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                let Some(callable) = callee.as_callable() else {
                    return Err(
                        WagagoError::runtime(paren, "Can only call functions and classes.").into(),
                    );
                };

                if args.len() != callable.arity() {
                    return Err(WagagoError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            args.len()
                        ),
                    )
                    .into());
                }

                callable.call(self, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(instance.get(name)?),
                Value::Module(module) => Ok(module.get(name)?),
                _ => Err(WagagoError::runtime(
                    name,
                    "Only instances and modules have properties.",
                )
                .into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(WagagoError::runtime(name, "Only instances have fields.").into());
                };

                let value: Value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// `super.method`: start the lookup at the statically enclosing class's
    /// superclass, then bind to the current `this`, which lives one scope
    /// inside the `super` scope.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance: usize = self
            .local_depth(id)
            .ok_or_else(|| WagagoError::runtime(keyword, "Can't use 'super' outside of a class."))?;

        let superclass: Option<Value> = environment::get_name_at(&self.environment, distance, "super");
        let object: Option<Value> = distance
            .checked_sub(1)
            .and_then(|d| environment::get_name_at(&self.environment, d, "this"));

        let (Some(Value::Class(superclass)), Some(Value::Instance(object))) = (superclass, object)
        else {
            return Err(WagagoError::runtime(keyword, "Can't use 'super' outside of a class.").into());
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
            None => Err(WagagoError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        let value: Value = match self.local_depth(id) {
            Some(distance) => environment::get_at(&self.environment, distance, name)?,
            None => self.globals.borrow().get(name)?,
        };

        debug!("Variable '{}' evaluated to: {}", name.lexeme, value);
        Ok(value)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(WagagoError::runtime(operator, "Operand must be a number.").into()),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(WagagoError::runtime(operator, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        debug!("Binary '{}' on {} and {}", operator.lexeme, left, right);

        match operator.token_type {
            TokenType::PLUS => add(operator, left, right),
            TokenType::MINUS => arithmetic(operator, left, right, |a, b| Value::Number(a - b)),
            TokenType::STAR => arithmetic(operator, left, right, |a, b| Value::Number(a * b)),
            // IEEE‑754: dividing by zero yields an infinity or NaN.
            TokenType::SLASH => arithmetic(operator, left, right, |a, b| Value::Number(a / b)),
            TokenType::GREATER => arithmetic(operator, left, right, |a, b| Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => {
                arithmetic(operator, left, right, |a, b| Value::Bool(a >= b))
            }
            TokenType::LESS => arithmetic(operator, left, right, |a, b| Value::Bool(a < b)),
            TokenType::LESS_EQUAL => arithmetic(operator, left, right, |a, b| Value::Bool(a <= b)),
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),
            _ => Err(WagagoError::runtime(operator, "Invalid binary operator.").into()),
        }
    }
}

/// Numeric operators: both operands must be numbers.
fn arithmetic(
    operator: &Token,
    left: Value,
    right: Value,
    op: impl FnOnce(f64, f64) -> Value,
) -> IResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(op(a, b)),
        _ => Err(WagagoError::runtime(operator, "Operands must be numbers.").into()),
    }
}

/// `+`: numbers add; otherwise a string on either side concatenates the
/// stringified operands; anything else faults.
fn add(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left, right)))
        }
        _ => Err(WagagoError::runtime(
            operator,
            "Operands must be two numbers or at least one string.",
        )
        .into()),
    }
}
