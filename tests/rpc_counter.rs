use std::net::TcpListener;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::routing::post;
use axum::Router;
use binprot::BinProtWrite;
use postrpc::{
    ApplicationException, BinaryProtocol, Client, MessageBuffer, MessageHeader, MessageKind, Rpc,
};

const DEBUG: bool = false;

struct GetUniqueId;
struct SetIdCounter;

impl Rpc for GetUniqueId {
    type Q = ();
    type R = i64;

    const METHOD: &'static str = "get-unique-id";
}

impl Rpc for SetIdCounter {
    type Q = i64;
    type R = ();

    const METHOD: &'static str = "set-id-counter";
}

fn reply<T: BinProtWrite>(request: &MessageHeader, kind: MessageKind, value: &T) -> Vec<u8> {
    let mut buffer = MessageBuffer::new(BinaryProtocol, Vec::new());
    buffer
        .write_message_begin(&MessageHeader {
            method: request.method.clone(),
            kind,
            seq: request.seq,
        })
        .unwrap();
    buffer.encode_struct(value).unwrap();
    buffer.write_message_end().unwrap();
    buffer.bytes().to_vec()
}

async fn handle(counter: Arc<AtomicI64>, body: Bytes) -> Vec<u8> {
    let mut request = MessageBuffer::new(BinaryProtocol, body.to_vec());
    let header = request.read_message_begin().unwrap();
    match header.method.as_str() {
        "get-unique-id" => {
            request.decode_struct::<()>().unwrap();
            request.read_message_end().unwrap();
            let value = counter.fetch_add(1, Ordering::SeqCst);
            reply(&header, MessageKind::Reply, &value)
        }
        "set-id-counter" => {
            let value: i64 = request.decode_struct().unwrap();
            request.read_message_end().unwrap();
            counter.store(value, Ordering::SeqCst);
            reply(&header, MessageKind::Reply, &())
        }
        other => reply(
            &header,
            MessageKind::Exception,
            &ApplicationException { message: format!("unknown method {}", other) },
        ),
    }
}

fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{}", addr)
}

fn counter_server() -> String {
    let counter = Arc::new(AtomicI64::new(0));
    let app = Router::new().route("/", post(move |body: Bytes| handle(counter.clone(), body)));
    serve(app)
}

#[test]
fn counter_test() -> Result<(), postrpc::Error> {
    if DEBUG {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    }
    let uri = counter_server();
    let client = Client::http(BinaryProtocol, uri);
    for i in 0..5i64 {
        let result = GetUniqueId::dispatch(&client, &())?;
        assert_eq!(result, i);
    }
    SetIdCounter::dispatch(&client, &42)?;
    for i in 0..5i64 {
        let result = GetUniqueId::dispatch(&client, &())?;
        assert_eq!(result, 42 + i);
    }
    Ok(())
}

#[test]
fn unknown_method_test() -> Result<(), postrpc::Error> {
    let uri = counter_server();
    let client = Client::http(BinaryProtocol, uri);
    let result = client.dispatch::<(), i64>("no-such-method", &());
    match result {
        Err(postrpc::Error::Application(message)) => {
            assert_eq!(message, "unknown method no-such-method")
        }
        other => panic!("unexpected result: {:?}", other),
    }
    // An application error is terminal for its call only.
    let result = GetUniqueId::dispatch(&client, &())?;
    assert_eq!(result, 0);
    Ok(())
}

#[test]
fn concurrent_dispatch_test() {
    let uri = counter_server();
    let client = Arc::new(Client::http(BinaryProtocol, uri));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        handles.push(std::thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..8 {
                seen.push(GetUniqueId::dispatch(&client, &()).unwrap());
            }
            seen
        }));
    }
    let mut all: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    all.sort_unstable();
    let expected: Vec<i64> = (0..32).collect();
    assert_eq!(all, expected);
}
