//! Checkout, payment, and order lifecycle against a live database.
//!
//! These tests require a running `PostgreSQL` database named by
//! `FESTIV_TEST_DATABASE_URL`; migrations are applied on first use.
//!
//! Run with: cargo test -p festiv-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use festiv_api::models::order::Placement;
use festiv_api::services::{CartService, CheckoutService, OrderService, ServiceError};
use festiv_core::pricing::PricedLine;
use festiv_core::{
    OrderStatus, PaymentMethod, PaymentStatus, PricingError, ProductCategory, ReturnStatus,
    TransitionError,
};
use festiv_integration_tests::fixtures::{
    coupon_used, create_flat_coupon, create_gateway_order, create_product, create_shopper,
    gateway_signature, migrated_pool, order_count, order_state, razorpay_client, set_stock,
    set_wallet, stock, wallet,
};

const TICKET: ProductCategory = ProductCategory::Ticket;
const APPAREL: ProductCategory = ProductCategory::Apparel;

fn rupees(amount: i64) -> Decimal {
    Decimal::from(amount)
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_cart_totals_follow_lines() {
    let pool = migrated_pool().await;
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 10).await;
    let tee = create_product(&pool, APPAREL, rupees(50), 10).await;
    let carts = CartService::new(&pool);

    carts.add_item(shopper.id, TICKET, pass, 2).await.unwrap();
    carts.add_item(shopper.id, APPAREL, tee, 1).await.unwrap();
    let view = carts.remove_one(shopper.id, TICKET, pass).await.unwrap();

    let line_sum: Decimal = view.items.iter().map(PricedLine::line_total).sum();
    assert_eq!(view.cart.total_price, rupees(150));
    assert_eq!(view.cart.total_price, line_sum);
    assert_eq!(view.cart.ticket_quantity, 1);
    assert_eq!(view.cart.apparel_quantity, 1);
    assert_eq!(view.payable, view.cart.total_price - view.cart.offer_price);

    let view = carts.remove_one(shopper.id, APPAREL, tee).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.cart.total_price, rupees(100));
    assert_eq!(view.cart.apparel_quantity, 0);
}

// ============================================================================
// COD and wallet checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_coupon_checkout_charges_discounted_total() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let code = create_flat_coupon(&pool, TICKET, rupees(20), 10).await;
    let carts = CartService::new(&pool);

    carts.add_item(shopper.id, TICKET, pass, 2).await.unwrap();
    let view = carts.apply_coupon(shopper.id, &code).await.unwrap();
    assert_eq!(view.cart.total_price, rupees(200));
    assert_eq!(view.payable, rupees(180));

    let placement = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Cod)
        .await
        .unwrap();
    let Placement::Placed { order, invoice } = placement else {
        panic!("cash on delivery completes at placement");
    };

    assert_eq!(order.total, rupees(180));
    assert_eq!(order.coupon_code.as_deref(), Some(code.as_str()));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(invoice.amount, rupees(180));
    assert_eq!(invoice.quantity, 2);
    assert_eq!(stock(&pool, TICKET, pass).await, 3);
    assert_eq!(coupon_used(&pool, &code).await, 1);
    assert!(carts.items(shopper.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_wallet_shortfall_places_nothing() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    set_wallet(&pool, shopper.id, rupees(50)).await;
    let carts = CartService::new(&pool);
    carts.add_item(shopper.id, TICKET, pass, 1).await.unwrap();

    let err = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Wallet)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Pricing(PricingError::InsufficientFunds { balance, required })
            if balance == rupees(50) && required == rupees(100)
    ));
    assert_eq!(order_count(&pool, shopper.id).await, 0);
    assert_eq!(wallet(&pool, shopper.id).await, rupees(50));
    assert_eq!(stock(&pool, TICKET, pass).await, 5);
    assert_eq!(carts.items(shopper.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_wallet_checkout_debits_balance() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let tee = create_product(&pool, APPAREL, rupees(100), 5).await;
    set_wallet(&pool, shopper.id, rupees(150)).await;
    CartService::new(&pool)
        .add_item(shopper.id, APPAREL, tee, 1)
        .await
        .unwrap();

    let placement = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Wallet)
        .await
        .unwrap();

    let Placement::Placed { order, .. } = placement else {
        panic!("wallet orders complete at placement");
    };
    assert_eq!(order.payment_status, PaymentStatus::Successful);
    assert_eq!(wallet(&pool, shopper.id).await, rupees(50));
    assert_eq!(stock(&pool, APPAREL, tee).await, 4);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_short_stock_rolls_back_checkout() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let code = create_flat_coupon(&pool, TICKET, rupees(20), 10).await;
    let carts = CartService::new(&pool);
    carts.add_item(shopper.id, TICKET, pass, 3).await.unwrap();
    carts.apply_coupon(shopper.id, &code).await.unwrap();

    // Someone else bought out the stock after the line was added.
    set_stock(&pool, TICKET, pass, 1).await;

    let err = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Cod)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Pricing(PricingError::InsufficientStock {
            available: 1,
            requested: 3
        })
    ));
    assert_eq!(order_count(&pool, shopper.id).await, 0);
    assert_eq!(stock(&pool, TICKET, pass).await, 1);
    assert_eq!(coupon_used(&pool, &code).await, 0);
    assert_eq!(carts.items(shopper.id).await.unwrap().len(), 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_cancel_pending_order_restocks() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    CartService::new(&pool)
        .add_item(shopper.id, TICKET, pass, 2)
        .await
        .unwrap();
    let Placement::Placed { order, .. } = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Cod)
        .await
        .unwrap()
    else {
        panic!("cash on delivery completes at placement");
    };
    assert_eq!(stock(&pool, TICKET, pass).await, 3);

    let canceled = OrderService::new(&pool)
        .cancel(shopper.id, order.id)
        .await
        .unwrap();

    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(stock(&pool, TICKET, pass).await, 5);
    assert_eq!(wallet(&pool, shopper.id).await, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_cancel_window_closes_on_delivery() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    CartService::new(&pool)
        .add_item(shopper.id, TICKET, pass, 1)
        .await
        .unwrap();
    let Placement::Placed { order, .. } = CheckoutService::new(&pool, &gateway)
        .place_order(shopper.id, shopper.address_id, PaymentMethod::Cod)
        .await
        .unwrap()
    else {
        panic!("cash on delivery completes at placement");
    };

    let orders = OrderService::new(&pool);
    orders
        .set_status(order.id, OrderStatus::Confirmed)
        .await
        .unwrap();
    let delivered = orders
        .set_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.payment_status, PaymentStatus::Successful);

    let err = orders.cancel(shopper.id, order.id).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::CancelWindowExceeded(OrderStatus::Delivered))
    ));
    assert_eq!(
        order_state(&pool, order.id).await,
        (OrderStatus::Delivered, PaymentStatus::Successful)
    );
    assert_eq!(stock(&pool, TICKET, pass).await, 4);
}

// ============================================================================
// Gateway payments
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_verified_payment_settles_order() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        2,
        OrderStatus::Pending,
    )
    .await;
    let signature = gateway_signature(&placed.gateway_order_id, "pay_settled01");

    let (order, invoice) = CheckoutService::new(&pool, &gateway)
        .verify_payment(
            shopper.id,
            &placed.gateway_order_id,
            "pay_settled01",
            &signature,
        )
        .await
        .unwrap();

    assert_eq!(order.payment_status, PaymentStatus::Successful);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(invoice.payment_id.as_deref(), Some("pay_settled01"));
    assert_eq!(stock(&pool, TICKET, pass).await, 3);
    assert_eq!(wallet(&pool, shopper.id).await, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_bad_signature_marks_payment_failed() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        1,
        OrderStatus::Pending,
    )
    .await;

    let err = CheckoutService::new(&pool, &gateway)
        .verify_payment(shopper.id, &placed.gateway_order_id, "pay_forged01", "00ff")
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Gateway(_)));
    assert_eq!(
        order_state(&pool, placed.id).await,
        (OrderStatus::Pending, PaymentStatus::Failed)
    );
    assert_eq!(stock(&pool, TICKET, pass).await, 5);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_payment_after_cancel_is_credited_to_wallet() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        2,
        OrderStatus::Pending,
    )
    .await;

    let canceled = OrderService::new(&pool)
        .cancel(shopper.id, placed.id)
        .await
        .unwrap();
    assert_eq!(canceled.payment_status, PaymentStatus::Pending);
    assert_eq!(stock(&pool, TICKET, pass).await, 5);

    // The shopper finishes paying in the gateway window after canceling.
    let signature = gateway_signature(&placed.gateway_order_id, "pay_late01");
    let err = CheckoutService::new(&pool, &gateway)
        .verify_payment(
            shopper.id,
            &placed.gateway_order_id,
            "pay_late01",
            &signature,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::PaymentCredited(_)));
    assert_eq!(
        order_state(&pool, placed.id).await,
        (OrderStatus::Canceled, PaymentStatus::Refund)
    );
    assert_eq!(wallet(&pool, shopper.id).await, rupees(200));
    assert_eq!(stock(&pool, TICKET, pass).await, 5);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_payment_for_sold_out_order_is_credited_to_wallet() {
    let pool = migrated_pool().await;
    let gateway = razorpay_client();
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        2,
        OrderStatus::Pending,
    )
    .await;
    set_stock(&pool, TICKET, pass, 1).await;

    let signature = gateway_signature(&placed.gateway_order_id, "pay_short01");
    let err = CheckoutService::new(&pool, &gateway)
        .verify_payment(
            shopper.id,
            &placed.gateway_order_id,
            "pay_short01",
            &signature,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::PaymentCredited(_)));
    assert_eq!(
        order_state(&pool, placed.id).await,
        (OrderStatus::Canceled, PaymentStatus::Refund)
    );
    assert_eq!(wallet(&pool, shopper.id).await, rupees(200));
    assert_eq!(stock(&pool, TICKET, pass).await, 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_unpaid_gateway_order_cannot_ship() {
    let pool = migrated_pool().await;
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        1,
        OrderStatus::Pending,
    )
    .await;

    let err = OrderService::new(&pool)
        .set_status(placed.id, OrderStatus::Confirmed)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::Unpaid(PaymentStatus::Pending))
    ));
    assert_eq!(
        order_state(&pool, placed.id).await,
        (OrderStatus::Pending, PaymentStatus::Pending)
    );
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database (FESTIV_TEST_DATABASE_URL)"]
async fn test_refunding_unpaid_gateway_return_credits_nothing() {
    let pool = migrated_pool().await;
    let shopper = create_shopper(&pool).await;
    let pass = create_product(&pool, TICKET, rupees(100), 5).await;
    // Delivered before payment checks existed; the payment never settled.
    let placed = create_gateway_order(
        &pool,
        &shopper,
        TICKET,
        pass,
        rupees(100),
        2,
        OrderStatus::Delivered,
    )
    .await;
    let orders = OrderService::new(&pool);

    let request = orders
        .request_return(shopper.id, placed.id, "wrong size")
        .await
        .unwrap();
    orders
        .review_return(request.id, ReturnStatus::Approved)
        .await
        .unwrap();
    let refund = orders.refund(placed.id).await.unwrap();

    assert_eq!(refund.wallet_credit, Decimal::ZERO);
    assert_eq!(refund.order.status, OrderStatus::Refunded);
    assert_eq!(refund.order.payment_status, PaymentStatus::Pending);
    assert_eq!(wallet(&pool, shopper.id).await, Decimal::ZERO);
    assert_eq!(stock(&pool, TICKET, pass).await, 5);
}
