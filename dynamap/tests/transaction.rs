/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod common;

use aws_sdk_dynamodb::operation::transact_get_items::TransactGetItemsOutput;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsOutput;
use aws_sdk_dynamodb::types::ItemResponse;
use common::{n, names, s, table, user_schema, wire};
use dynamap::request::Request;
use dynamap::test_util::{MockTransport, RuleBuilder};
use dynamap::transaction::{FragmentItem, TransactionRequest};
use dynamap::{
    object, Condition, CreateSettings, DeleteSettings, FragmentKind, GetSettings,
    ModelDefinition, Table, Transaction, TransactionResult, UpdateSettings, UpdateSpec,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn models_build_tagged_fragments() {
    let table = table(&MockTransport::new(), user_schema());
    let users = table.model("User").unwrap();
    let tx = users.transaction();

    let get = tx.get(1, &GetSettings::new()).unwrap();
    let create = tx
        .create(&object! { "id" => 2, "name" => "Bob" }, &CreateSettings::new())
        .await
        .unwrap();
    let update = tx
        .update(3, &UpdateSpec::new().set("age", 4), &UpdateSettings::new())
        .await
        .unwrap();
    let delete = tx.delete(4, &DeleteSettings::new()).unwrap();
    let check = tx
        .condition(5, &Condition::new().attribute("name").eq("Tim"))
        .unwrap();

    let kinds: Vec<_> = [&get, &create, &update, &delete, &check]
        .iter()
        .map(|fragment| fragment.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            FragmentKind::Get,
            FragmentKind::Put,
            FragmentKind::Update,
            FragmentKind::Delete,
            FragmentKind::ConditionCheck,
        ]
    );
    assert_eq!(check.model_name(), "User");
    assert_eq!(check.table_name(), "users");

    let FragmentItem::Put(put) = create.item() else {
        panic!("expected a put fragment");
    };
    assert_eq!(put.item(), &wire(&[("id", n("2")), ("name", s("Bob"))]));

    let FragmentItem::Update(update) = update.item() else {
        panic!("expected an update fragment");
    };
    assert_eq!(update.update_expression(), "SET #a0 = :v0");

    let FragmentItem::ConditionCheck(check) = check.item() else {
        panic!("expected a condition check fragment");
    };
    assert_eq!(check.condition_expression(), "#ca0 = :cv0");
    assert_eq!(
        check.expression_attribute_names(),
        Some(&names(&[("#ca0", "name")]))
    );
}

#[test]
fn empty_conditions_are_rejected() {
    let table = table(&MockTransport::new(), user_schema());
    let users = table.model("User").unwrap();
    let err = users
        .transaction()
        .condition(1, &Condition::new())
        .unwrap_err();
    assert!(err.is_invalid_parameter());
}

#[tokio::test]
async fn get_transactions_return_items_in_fragment_order() {
    let rule = RuleBuilder::new()
        .match_requests(|req| matches!(req, Request::TransactGetItems(_)))
        .then_output(|_| {
            TransactGetItemsOutput::builder()
                .responses(
                    ItemResponse::builder()
                        .set_item(Some(wire(&[("id", n("1")), ("name", s("Charlie"))])))
                        .build(),
                )
                .responses(ItemResponse::builder().build())
                .build()
                .into()
        });
    let transport = MockTransport::new().with_rule(&rule);
    let table = table(&transport, user_schema());
    let users = table.model("User").unwrap();
    let tx = users.transaction();

    let result = table
        .transaction()
        .fragment(tx.get(1, &GetSettings::new()).unwrap())
        .fragment(tx.get(2, &GetSettings::new()).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(
        result,
        TransactionResult::Items(vec![
            Some(object! { "id" => 1, "name" => "Charlie" }),
            None,
        ])
    );
    assert_eq!(transport.operations(), vec!["TransactGetItems"]);
}

#[tokio::test]
async fn write_transactions_send_every_fragment() {
    let rule = RuleBuilder::new()
        .match_requests(|req| matches!(req, Request::TransactWriteItems(_)))
        .then_output(|_| TransactWriteItemsOutput::builder().build().into());
    let transport = MockTransport::new().with_rule(&rule);
    let table = table(&transport, user_schema());
    let users = table.model("User").unwrap();
    let tx = users.transaction();

    let result = table
        .transaction()
        .fragments([
            tx.create(&object! { "id" => 1 }, &CreateSettings::new())
                .await
                .unwrap(),
            tx.delete(2, &DeleteSettings::new()).unwrap(),
            tx.condition(3, &Condition::new().attribute("id").exists())
                .unwrap(),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(result, TransactionResult::Written);

    let Request::TransactWriteItems(input) = &transport.requests()[0] else {
        panic!("expected a TransactWriteItems request");
    };
    let items = input.transact_items();
    assert_eq!(items.len(), 3);
    assert!(items[0].put().is_some());
    assert!(items[1].delete().is_some());
    assert!(items[2].condition_check().is_some());
}

#[tokio::test]
async fn fragments_of_unregistered_models_are_rejected() {
    let transport = MockTransport::new();
    let registered = table(&transport, user_schema());
    let other = Table::builder("accounts")
        .model(ModelDefinition::new("Account", user_schema()))
        .transport(transport.clone())
        .build()
        .unwrap();
    let accounts = other.model("Account").unwrap();

    let err = registered
        .transaction()
        .fragment(accounts.transaction().delete(1, &DeleteSettings::new()).unwrap())
        .send()
        .await
        .unwrap_err();
    assert!(err.is_invalid_parameter());
    assert_eq!(
        err.to_string(),
        "Model Account is not registered with table accounts"
    );
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn gets_and_writes_can_not_be_mixed() {
    let table = table(&MockTransport::new(), user_schema());
    let users = table.model("User").unwrap();
    let tx = users.transaction();
    let transaction = table
        .transaction()
        .fragment(tx.get(1, &GetSettings::new()).unwrap())
        .fragment(tx.delete(2, &DeleteSettings::new()).unwrap());
    assert!(transaction.request().unwrap_err().is_invalid_parameter());
    assert!(Transaction::new()
        .table(&table)
        .request()
        .unwrap_err()
        .is_invalid_parameter());
}

#[test]
fn request_can_be_built_without_sending() {
    let table = table(&MockTransport::new(), user_schema());
    let users = table.model("User").unwrap();
    let request = table
        .transaction()
        .fragment(users.transaction().get(1, &GetSettings::new()).unwrap())
        .request()
        .unwrap();
    let TransactionRequest::Get(input) = request else {
        panic!("expected a get transaction");
    };
    assert_eq!(
        input.transact_items()[0].get().map(|get| get.key()),
        Some(&wire(&[("id", n("1"))]))
    );
}
