use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::prelude::*;

/// Builds the instance for a host-backed class. Failures are logged by the
/// constructor itself and surface to scripts as `nil`.
pub type NativeConstructor = fn(&Rc<Class>, Vec<Object>) -> Object;

/// Native methods get the instance itself, not a borrow of it. They borrow
/// only around handle access, so arguments (which may be the instance) can
/// still be displayed.
pub type NativeMethodFn = fn(&Shared<Instance>, Vec<Object>) -> Object;

#[derive(Debug, Clone, Copy)]
pub struct NativeMethod {
    pub name: &'static str,
    pub arity: usize,
    pub function: NativeMethodFn,
}

/// The host side of a class such as `Socket`.
#[derive(Debug)]
pub struct NativeClass {
    arity: usize,
    constructor: NativeConstructor,
    methods: HashMap<&'static str, NativeMethod>,
}

impl NativeClass {
    pub fn new(arity: usize, constructor: NativeConstructor) -> Self {
        Self { arity, constructor, methods: HashMap::new() }
    }

    pub fn with_method(mut self, method: NativeMethod) -> Self {
        self.methods.insert(method.name, method);
        self
    }
}

#[derive(Debug)]
pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
    getters: HashMap<String, Rc<Getter>>,
    native: Option<NativeClass>,
}

impl Class {
    pub fn new(
        name: impl AsRef<str>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
        getters: HashMap<String, Rc<Getter>>,
    ) -> Self {
        Self { name: name.as_ref().to_owned(), superclass, methods, getters, native: None }
    }

    /// Native classes never have a superclass nor script-defined members.
    pub fn native(name: impl AsRef<str>, native: NativeClass) -> Self {
        Self {
            name: name.as_ref().to_owned(),
            superclass: None,
            methods: HashMap::new(),
            getters: HashMap::new(),
            native: Some(native),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn construct(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        if let Some(native) = &class.native {
            return Ok((native.constructor)(class, arguments));
        }

        let instance = Rc::new(RefCell::new(Instance::new(class.clone())));

        if let Some(initializer) = class.find_method("init") {
            initializer.bind(Object::Instance(instance.clone())).call(interpreter, arguments)?;
        }

        Ok(Object::Instance(instance))
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
    }

    pub fn find_getter(&self, name: &str) -> Option<Rc<Getter>> {
        if let Some(getter) = self.getters.get(name) {
            return Some(getter.clone());
        }

        self.superclass.as_ref().and_then(|superclass| superclass.find_getter(name))
    }

    pub fn find_native_method(&self, name: &str) -> Option<NativeMethod> {
        self.native.as_ref().and_then(|native| native.methods.get(name).copied())
    }

    pub fn arity(&self) -> usize {
        if let Some(native) = &self.native {
            return native.arity;
        }

        self.find_method("init").map_or(0, |initializer| initializer.arity())
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Object>,
    handle: Option<NativeHandle>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self { class, fields: HashMap::new(), handle: None }
    }

    pub fn with_handle(self, handle: NativeHandle) -> Self {
        Self { handle: Some(handle), ..self }
    }

    pub fn handle_mut(&mut self) -> Option<&mut NativeHandle> {
        self.handle.as_mut()
    }

    pub fn take_handle(&mut self) -> Option<NativeHandle> {
        self.handle.take()
    }

    /// Property lookup: fields, then getters, then methods, then native
    /// methods. Getters and methods come back bound to `this`.
    pub fn get(this: &Shared<Instance>, name: &Token) -> Result<Object, RuntimeError> {
        let class = {
            let instance = this.borrow();
            if let Some(value) = instance.fields.get(&name.lexeme) {
                return Ok(value.clone());
            }
            instance.class.clone()
        };

        if let Some(getter) = class.find_getter(&name.lexeme) {
            return Ok(Object::Callable(getter.bind(Object::Instance(this.clone()))));
        }

        if let Some(method) = class.find_method(&name.lexeme) {
            return Ok(Object::Callable(method.bind(Object::Instance(this.clone()))));
        }

        if let Some(method) = class.find_native_method(&name.lexeme) {
            return Ok(Object::Callable(Rc::new(BoundNativeMethod {
                method,
                instance: this.clone(),
            })));
        }

        Err(RuntimeError::undefined_property(name))
    }

    pub fn set(&mut self, name: &Token, value: Object) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} instance", self.class)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A native method together with the instance whose host state it works on.
#[derive(Debug)]
pub struct BoundNativeMethod {
    method: NativeMethod,
    instance: Shared<Instance>,
}

impl Callable for BoundNativeMethod {
    fn arity(&self) -> usize {
        self.method.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        Ok((self.method.function)(&self.instance, arguments))
    }
}

impl Display for BoundNativeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.method.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_class(name: &str, superclass: Option<Rc<Class>>) -> Rc<Class> {
        Rc::new(Class::new(name, superclass, HashMap::new(), HashMap::new()))
    }

    #[test]
    fn fields_are_dynamic() {
        let class = empty_class("Point", None);
        let instance = Rc::new(RefCell::new(Instance::new(class)));
        let x = Token::synthetic("x", 1);

        assert!(matches!(
            Instance::get(&instance, &x),
            Err(RuntimeError::UndefinedVariable { .. })
        ));

        instance.borrow_mut().set(&x, Object::Number(3.0));
        assert_eq!(Instance::get(&instance, &x).unwrap(), Object::Number(3.0));
    }

    #[test]
    fn arity_defaults_to_zero_without_initializer() {
        let base = empty_class("Base", None);
        let derived = empty_class("Derived", Some(base));
        assert_eq!(derived.arity(), 0);
        assert!(derived.find_method("init").is_none());
        assert_eq!(derived.to_string(), "Derived");
    }
}
