//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for calls encoded with the JSON codec.

use localrpc::codec::JsonCodec;
use localrpc::config::{CONNECTION_URL_LIST, StaticProperties};
use localrpc::invoker::{encode_value, execute};
use localrpc::{
    DeploymentBlock, Dispatcher, Invocation, InvocationError, LocalEnvironment, ProxyFactory,
    local_service,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub items: Vec<String>,
}

#[derive(Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum OrderError {
    #[error("order {0} is empty")]
    Empty(u64),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[local_service]
pub trait OrderService: Send + Sync {
    fn submit(&self, order: Order) -> Result<usize, OrderError>;
}

struct Orders;

impl OrderService for Orders {
    fn submit(&self, order: Order) -> Result<usize, OrderError> {
        if order.items.is_empty() {
            return Err(OrderError::Empty(order.id));
        }
        Ok(order.items.len())
    }
}

fn environment() -> LocalEnvironment {
    LocalEnvironment::new().with_properties(
        StaticProperties::new().with_property(CONNECTION_URL_LIST, "http://localhost:8080/shop"),
    )
}

#[test]
fn test_generated_service_with_json() {
    let environment = environment();
    let _block = DeploymentBlock::new("shop")
        .with_service(
            "/orders",
            OrderServiceInvoker::with_codec(Arc::new(Orders), JsonCodec::new()),
        )
        .start(&environment)
        .unwrap();

    let orders = ProxyFactory::new()
        .with_environment(environment)
        .with_codec(JsonCodec::new())
        .create::<dyn OrderService>("orders")
        .unwrap();

    let order = Order {
        id: 3,
        items: vec!["tea".to_string(), "milk".to_string()],
    };
    assert_eq!(orders.submit(order), Ok(2));
    assert_eq!(
        orders.submit(Order {
            id: 4,
            items: Vec::new(),
        }),
        Err(OrderError::Empty(4))
    );
}

#[test]
fn test_arguments_travel_as_json() {
    let environment = environment();
    let codec = JsonCodec::new();
    let _block = DeploymentBlock::new("shop")
        .with_service("/inspect", move |invocation: Invocation| {
            execute(&codec, invocation, |invocation| {
                let payload = invocation.argument_payload(0).unwrap_or_default();
                let json: serde_json::Value = serde_json::from_slice(payload)
                    .map_err(|err| InvocationError::protocol(err.to_string()))?;
                encode_value(&codec, Ok::<_, InvocationError>(json["items"][1].clone()))
            })
        })
        .start(&environment)
        .unwrap();

    let dispatcher = Dispatcher::with_codec("inspect", environment, JsonCodec::new()).unwrap();
    let second: serde_json::Value = dispatcher
        .call("inspect")
        .and_then(|call| {
            call.argument(&Order {
                id: 1,
                items: vec!["tea".to_string(), "milk".to_string()],
            })
        })
        .unwrap()
        .invoke::<_, InvocationError>()
        .unwrap();
    assert_eq!(second, serde_json::json!("milk"));
}
