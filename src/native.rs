use std::cell::RefCell;
use std::fmt::Display;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, error};

use crate::prelude::*;

/// Host state owned by instances of native classes.
#[derive(Debug)]
pub enum NativeHandle {
    Socket(Connection),
    Server(TcpListener),
}

#[derive(Debug)]
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn new(stream: TcpStream) -> std::io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self { reader: BufReader::new(stream), writer })
    }
}

pub fn register(globals: &mut Environment) {
    globals.define("clock", Object::Callable(Rc::new(Clock)));
    globals.define("input", Object::Callable(Rc::new(Input)));
    globals.define("reverse", Object::Callable(Rc::new(Reverse)));
    globals.define("Socket", Object::Class(socket_class()));
    globals.define("ServerSocket", Object::Class(server_socket_class()));
}

#[derive(Debug)]
struct Clock;

impl Callable for Clock {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        _arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        // A clock set before the epoch reads as zero.
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();

        Ok(Object::Number(since_epoch.as_millis() as f64 / 1000.0))
    }
}

impl Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn clock>")
    }
}

#[derive(Debug)]
struct Input;

impl Callable for Input {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        match interpreter.read_line() {
            Ok(Some(line)) => Ok(Object::String(line)),
            Ok(None) => {
                debug!("input: end of stream");
                Ok(Object::Null)
            }
            Err(e) => {
                error!("input: {e}");
                Ok(Object::Null)
            }
        }
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn input>")
    }
}

#[derive(Debug)]
struct Reverse;

impl Callable for Reverse {
    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        let text = arguments.first().map(Object::to_string).unwrap_or_default();
        Ok(Object::String(text.chars().rev().collect()))
    }
}

impl Display for Reverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn reverse>")
    }
}

pub fn socket_class() -> Rc<Class> {
    let native = NativeClass::new(2, connect)
        .with_method(NativeMethod { name: "send", arity: 1, function: send })
        .with_method(NativeMethod { name: "receive", arity: 0, function: receive })
        .with_method(NativeMethod { name: "close", arity: 0, function: close });

    Rc::new(Class::native("Socket", native))
}

pub fn server_socket_class() -> Rc<Class> {
    let native = NativeClass::new(1, listen).with_method(NativeMethod {
        name: "accept",
        arity: 0,
        function: accept,
    });

    Rc::new(Class::native("ServerSocket", native))
}

fn port(value: Option<&Object>) -> Option<u16> {
    let port = value?.number()?;
    if port.fract() != 0.0 {
        return None;
    }
    u16::try_from(port as i64).ok()
}

fn instance_with(class: &Rc<Class>, handle: NativeHandle) -> Object {
    Object::Instance(Rc::new(RefCell::new(Instance::new(class.clone()).with_handle(handle))))
}

fn connect(class: &Rc<Class>, arguments: Vec<Object>) -> Object {
    let (Some(address), Some(port)) =
        (arguments.first().and_then(Object::string), port(arguments.get(1)))
    else {
        error!("Socket: expected an address string and a port number, got {arguments:?}");
        return Object::Null;
    };

    match TcpStream::connect((address, port)).and_then(Connection::new) {
        Ok(connection) => {
            debug!("Socket: connected to {address}:{port}");
            instance_with(class, NativeHandle::Socket(connection))
        }
        Err(e) => {
            error!("Socket: cannot connect to {address}:{port}: {e}");
            Object::Null
        }
    }
}

fn send(this: &Shared<Instance>, arguments: Vec<Object>) -> Object {
    // Displaying the argument may borrow `this`, so it happens first.
    let data = arguments.first().map(Object::to_string).unwrap_or_default();

    let mut instance = this.borrow_mut();
    let Some(NativeHandle::Socket(connection)) = instance.handle_mut() else {
        error!("Socket.send: socket is closed");
        return Object::Null;
    };

    let written = writeln!(connection.writer, "{data}").and_then(|_| connection.writer.flush());
    if let Err(e) = written {
        error!("Socket.send: {e}");
    }

    Object::Null
}

fn receive(this: &Shared<Instance>, _arguments: Vec<Object>) -> Object {
    let mut instance = this.borrow_mut();
    let Some(NativeHandle::Socket(connection)) = instance.handle_mut() else {
        error!("Socket.receive: socket is closed");
        return Object::Null;
    };

    let mut line = String::new();
    match connection.reader.read_line(&mut line) {
        Ok(0) => {
            error!("Socket.receive: connection closed by peer");
            Object::Null
        }
        Ok(_) => Object::String(strip_line_ending(line)),
        Err(e) => {
            error!("Socket.receive: {e}");
            Object::Null
        }
    }
}

fn close(this: &Shared<Instance>, _arguments: Vec<Object>) -> Object {
    let handle = this.borrow_mut().take_handle();
    if let Some(NativeHandle::Socket(connection)) = handle {
        if let Err(e) = connection.writer.shutdown(Shutdown::Both) {
            error!("Socket.close: {e}");
        }
    }

    Object::Null
}

fn listen(class: &Rc<Class>, arguments: Vec<Object>) -> Object {
    let Some(port) = port(arguments.first()) else {
        error!("ServerSocket: expected a port number, got {arguments:?}");
        return Object::Null;
    };

    match TcpListener::bind(("0.0.0.0", port)) {
        Ok(listener) => {
            debug!("ServerSocket: listening on port {port}");
            instance_with(class, NativeHandle::Server(listener))
        }
        Err(e) => {
            error!("ServerSocket: cannot listen on port {port}: {e}");
            Object::Null
        }
    }
}

fn accept(this: &Shared<Instance>, _arguments: Vec<Object>) -> Object {
    let mut instance = this.borrow_mut();
    let Some(NativeHandle::Server(listener)) = instance.handle_mut() else {
        error!("ServerSocket.accept: server socket is not listening");
        return Object::Null;
    };

    match listener.accept().and_then(|(stream, _)| Connection::new(stream)) {
        Ok(connection) => instance_with(&socket_class(), NativeHandle::Socket(connection)),
        Err(e) => {
            error!("ServerSocket.accept: {e}");
            Object::Null
        }
    }
}

pub(crate) fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_must_be_integral_and_in_range() {
        assert_eq!(port(Some(&Object::Number(8080.0))), Some(8080));
        assert_eq!(port(Some(&Object::Number(80.5))), None);
        assert_eq!(port(Some(&Object::Number(70000.0))), None);
        assert_eq!(port(Some(&Object::String("80".to_owned()))), None);
        assert_eq!(port(None), None);
    }

    #[test]
    fn line_endings_are_stripped() {
        assert_eq!(strip_line_ending("hello\r\n".to_owned()), "hello");
        assert_eq!(strip_line_ending("hello\n".to_owned()), "hello");
        assert_eq!(strip_line_ending("hello".to_owned()), "hello");
    }

    #[test]
    fn constructor_rejects_bad_arguments() {
        let class = socket_class();
        assert_eq!(connect(&class, vec![Object::Number(1.0), Object::Number(2.0)]), Object::Null);

        let server = server_socket_class();
        assert_eq!(listen(&server, vec![Object::String("x".to_owned())]), Object::Null);
    }

    #[test]
    fn socket_round_trip_over_loopback() {
        let server = server_socket_class();
        let listening = listen(&server, vec![Object::Number(0.0)]);
        let Object::Instance(listening) = listening else {
            panic!("server socket failed to bind");
        };

        let addr = match listening.borrow_mut().handle_mut() {
            Some(NativeHandle::Server(listener)) => listener.local_addr().unwrap(),
            other => panic!("unexpected handle {other:?}"),
        };

        let client = connect(
            &socket_class(),
            vec![Object::String("127.0.0.1".to_owned()), Object::Number(addr.port() as f64)],
        );
        let Object::Instance(client) = client else {
            panic!("client failed to connect");
        };

        let Object::Instance(peer) = accept(&listening, vec![]) else {
            panic!("accept failed");
        };

        send(&client, vec![Object::Number(42.0)]);
        assert_eq!(receive(&peer, vec![]), Object::String("42".to_owned()));

        close(&client, vec![]);
        assert_eq!(send(&client, vec![Object::Null]), Object::Null);
        assert_eq!(receive(&peer, vec![]), Object::Null);
    }

    #[test]
    fn socket_can_send_itself() {
        let Object::Instance(listening) = listen(&server_socket_class(), vec![Object::Number(0.0)])
        else {
            panic!("server socket failed to bind");
        };
        let port = match listening.borrow_mut().handle_mut() {
            Some(NativeHandle::Server(listener)) => listener.local_addr().unwrap().port(),
            other => panic!("unexpected handle {other:?}"),
        };

        let client = connect(
            &socket_class(),
            vec![Object::String("127.0.0.1".to_owned()), Object::Number(port as f64)],
        );
        let Object::Instance(peer) = accept(&listening, vec![]) else {
            panic!("accept failed");
        };
        let Object::Instance(sender) = &client else {
            panic!("client failed to connect");
        };

        send(sender, vec![client.clone()]);
        assert_eq!(receive(&peer, vec![]), Object::String("Socket instance".to_owned()));
    }
}
