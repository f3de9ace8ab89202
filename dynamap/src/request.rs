/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Requests handed to, and responses returned by, a [`Transport`](crate::transport::Transport).
//!
//! The payloads are the DynamoDB operation inputs and outputs, so a transport backed by the SDK
//! client can forward them without translation.

use aws_sdk_dynamodb::operation::batch_get_item::{BatchGetItemInput, BatchGetItemOutput};
use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput};
use aws_sdk_dynamodb::operation::delete_item::{DeleteItemInput, DeleteItemOutput};
use aws_sdk_dynamodb::operation::get_item::{GetItemInput, GetItemOutput};
use aws_sdk_dynamodb::operation::put_item::{PutItemInput, PutItemOutput};
use aws_sdk_dynamodb::operation::transact_get_items::{
    TransactGetItemsInput, TransactGetItemsOutput,
};
use aws_sdk_dynamodb::operation::transact_write_items::{
    TransactWriteItemsInput, TransactWriteItemsOutput,
};
use aws_sdk_dynamodb::operation::update_item::{UpdateItemInput, UpdateItemOutput};

macro_rules! operations {
    ($($variant:ident($input:ty, $output:ty)),+ $(,)?) => {
        /// A request for one DynamoDB operation.
        #[derive(Debug, Clone)]
        #[non_exhaustive]
        #[allow(missing_docs)]
        pub enum Request {
            $($variant($input),)+
        }

        /// The response to a [`Request`].
        #[derive(Debug, Clone)]
        #[non_exhaustive]
        #[allow(missing_docs)]
        pub enum Response {
            $($variant($output),)+
        }

        impl Request {
            /// The DynamoDB operation name, such as `GetItem`.
            pub fn operation_name(&self) -> &'static str {
                match self {
                    $(Request::$variant(_) => stringify!($variant),)+
                }
            }
        }

        impl Response {
            /// The DynamoDB operation name, such as `GetItem`.
            pub fn operation_name(&self) -> &'static str {
                match self {
                    $(Response::$variant(_) => stringify!($variant),)+
                }
            }
        }

        $(
            impl From<$input> for Request {
                fn from(input: $input) -> Self {
                    Request::$variant(input)
                }
            }

            impl From<$output> for Response {
                fn from(output: $output) -> Self {
                    Response::$variant(output)
                }
            }
        )+
    };
}

operations!(
    GetItem(GetItemInput, GetItemOutput),
    PutItem(PutItemInput, PutItemOutput),
    UpdateItem(UpdateItemInput, UpdateItemOutput),
    DeleteItem(DeleteItemInput, DeleteItemOutput),
    BatchGetItem(BatchGetItemInput, BatchGetItemOutput),
    BatchWriteItem(BatchWriteItemInput, BatchWriteItemOutput),
    TransactGetItems(TransactGetItemsInput, TransactGetItemsOutput),
    TransactWriteItems(TransactWriteItemsInput, TransactWriteItemsOutput),
);
