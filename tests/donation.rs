use anyhow::Result;
use entity::{donation_type, donor, payment, payment_history};
use receiptbox::{Error, NewDonation};
use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, PaginatorTrait, Set};
use util::{create_test_context, create_test_context_with, donation, TestContext};

mod util;

async fn counts(ctx: &TestContext) -> Result<(u64, u64, u64)> {
    let db = ctx.state.service.db();
    Ok((
        donor::Entity::find().count(db).await?,
        payment::Entity::find().count(db).await?,
        payment_history::Entity::find().count(db).await?,
    ))
}

#[tokio::test]
async fn create_order_and_payment() -> Result<()> {
    let ctx = create_test_context().await?;
    let service = &ctx.state.service;
    let mut input = donation("9840000001", Some("asha@example.org"), "1250.50");
    input.address = Some(" 12 MG Road, Pune ".to_owned());
    input.tax_id = Some("abcde1234f".to_owned());

    let res = service.initiate_donation(input).await?;
    assert!(!res.reused);
    assert_eq!(res.donor.contact, "9840000001");
    assert_eq!(res.donor.email.as_deref(), Some("asha@example.org"));
    assert_eq!(res.donor.address.as_deref(), Some("12 MG Road, Pune"));
    assert_eq!(res.donor.tax_id.as_deref(), Some("ABCDE1234F"));
    assert_eq!(res.payment.amount, 125_050);
    assert_eq!(res.payment.donor_id, res.donor.id);

    let orders = ctx.gateway.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].amount, 125_050);
    assert_eq!(orders[0].currency, "INR");
    assert_eq!(orders[0].receipt, res.payment.external_ref);
    assert_eq!(orders[0].notes.get("contact").map(String::as_str), Some("9840000001"));
    assert_eq!(orders[0].notes.get("donor_name").map(String::as_str), Some("Asha Rao"));

    // lazily created default type
    let t = service.get_donation_type("General Donation").await?.unwrap();
    assert_eq!(res.payment.donation_type_id, t.id);
    assert!(t.active);
    assert_eq!(t.min_amount, 0);
    Ok(())
}

#[tokio::test]
async fn validation() -> Result<()> {
    let ctx = create_test_context().await?;
    let service = &ctx.state.service;
    let cases = vec![
        NewDonation {
            name: " ".to_owned(),
            ..donation("9840000002", None, "10")
        },
        donation("", None, "10"),
        donation("9840000002", None, ""),
        donation("9840000002", None, "-10"),
        donation("9840000002", None, "0"),
        donation("9840000002", None, "10.001"),
        donation("9840000002", None, "ten"),
        donation("9840000002", None, "1e3"),
        donation("9840000002", Some("not-an-email"), "10"),
        NewDonation {
            donation_type: Some("Temple Fund".to_owned()),
            ..donation("9840000002", None, "10")
        },
    ];
    for input in cases {
        let res = service.initiate_donation(input.clone()).await;
        assert!(matches!(res, Err(Error::InvalidParam(_))), "{:?}", input);
    }
    assert!(ctx.gateway.orders().is_empty());
    assert_eq!(counts(&ctx).await?, (0, 0, 0));
    Ok(())
}

#[tokio::test]
async fn donation_type_rules() -> Result<()> {
    let ctx = create_test_context().await?;
    let service = &ctx.state.service;
    for (name, min_amount, active) in [("Annadanam", 50_000, true), ("Old Fund", 0, false)] {
        donation_type::ActiveModel {
            id: NotSet,
            name: Set(name.to_owned()),
            min_amount: Set(min_amount),
            active: Set(active),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(service.db())
        .await?;
    }

    let below = NewDonation {
        donation_type: Some("Annadanam".to_owned()),
        ..donation("9840000003", None, "499.99")
    };
    assert!(matches!(
        service.initiate_donation(below).await,
        Err(Error::InvalidParam(m)) if m.contains("500.00")
    ));
    let inactive = NewDonation {
        donation_type: Some("Old Fund".to_owned()),
        ..donation("9840000003", None, "1000")
    };
    assert!(matches!(
        service.initiate_donation(inactive).await,
        Err(Error::InvalidParam(_))
    ));

    let ok = NewDonation {
        donation_type: Some("Annadanam".to_owned()),
        ..donation("9840000003", None, "500")
    };
    let res = service.initiate_donation(ok).await?;
    let t = service.get_donation_type("Annadanam").await?.unwrap();
    assert_eq!(res.payment.donation_type_id, t.id);
    Ok(())
}

#[tokio::test]
async fn gateway_unavailable() -> Result<()> {
    let ctx = create_test_context().await?;
    let service = &ctx.state.service;
    ctx.gateway.set_fail(true);

    let res = service
        .initiate_donation(donation("9840000004", Some("a@example.org"), "10"))
        .await;
    assert!(matches!(res, Err(Error::GatewayUnavailable(_))));
    assert_eq!(counts(&ctx).await?, (0, 0, 0));
    assert!(service.get_donation_type("General Donation").await?.is_none());

    // retry succeeds once the gateway is back
    ctx.gateway.set_fail(false);
    let res = service
        .initiate_donation(donation("9840000004", Some("a@example.org"), "10"))
        .await?;
    assert!(!res.reused);
    assert_eq!(counts(&ctx).await?, (1, 1, 1));
    Ok(())
}

#[tokio::test]
async fn donor_upsert_and_backfill() -> Result<()> {
    let ctx = create_test_context_with(|s| s.donation.pending_reuse_secs = 0).await?;
    let service = &ctx.state.service;

    let first = service
        .initiate_donation(donation("9840000005", None, "10"))
        .await?;
    assert_eq!(first.donor.email, None);

    let second = service
        .initiate_donation(NewDonation {
            name: "Someone Else".to_owned(),
            ..donation(" 9840000005 ", Some("asha@example.org"), "10")
        })
        .await?;
    assert!(!second.reused);
    assert_eq!(second.donor.id, first.donor.id);
    // only the email is backfilled
    assert_eq!(second.donor.name, "Asha Rao");
    assert_eq!(second.donor.email.as_deref(), Some("asha@example.org"));

    let third = service
        .initiate_donation(donation("9840000005", Some("other@example.org"), "10"))
        .await?;
    assert_eq!(third.donor.email.as_deref(), Some("asha@example.org"));

    assert_eq!(counts(&ctx).await?, (1, 3, 3));
    assert_eq!(ctx.gateway.orders().len(), 3);
    Ok(())
}

#[tokio::test]
async fn reuse_pending_payment() -> Result<()> {
    let ctx = create_test_context().await?;
    let service = &ctx.state.service;

    let first = service
        .initiate_donation(donation("9840000006", None, "300"))
        .await?;
    let again = service
        .initiate_donation(donation("9840000006", Some("late@example.org"), "300.00"))
        .await?;
    assert!(again.reused);
    assert_eq!(again.payment.id, first.payment.id);
    assert_eq!(again.payment.transaction_id, first.payment.transaction_id);
    assert_eq!(again.donor.email.as_deref(), Some("late@example.org"));
    assert_eq!(ctx.gateway.orders().len(), 1);

    // another amount is another payment
    let other = service
        .initiate_donation(donation("9840000006", None, "301"))
        .await?;
    assert!(!other.reused);
    assert_eq!(ctx.gateway.orders().len(), 2);

    // settled payments are not handed out again
    service.mark_failed(&first.payment, "abandoned").await?;
    let fresh = service
        .initiate_donation(donation("9840000006", None, "300"))
        .await?;
    assert!(!fresh.reused);
    assert_ne!(fresh.payment.id, first.payment.id);
    Ok(())
}
