use std::{collections::HashSet, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rust_decimal::Decimal;
use sqlite::{version, Connection, ConnectionThreadSafe, State, Statement, Value};
use thiserror::Error;

use crate::{
    storage::{
        ConnectionStorage, PaymentStorage, SettingsStorage, Storage, SyncedPaymentStorage,
        WalletStorage,
    },
    Confirmation, ExtensionSettings, Payment, PaymentStatus, Reservation, SyncedPayment,
    TaxRateCategory, WalletConfig, XeroConnection,
};

/// `SQLite` database.
pub struct Sqlite {
    db: ConnectionThreadSafe,
}

impl Sqlite {
    /// Open a [`SQLite`](sqlite) database at the specified location. Creates a
    /// new database and any missing tables if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database could not be opened at the specified
    /// path.
    pub fn new(path: &str) -> Result<Sqlite, SqliteStorageError> {
        let db = Connection::open_thread_safe(path)?;
        debug!("Connection to SQLite v{} database established", version());

        db.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                user_id            TEXT NOT NULL PRIMARY KEY,
                xero_client_id     TEXT,
                xero_client_secret TEXT,
                xero_tax_standard  TEXT,
                xero_tax_zero      TEXT,
                xero_tax_exempt    TEXT,
                updated_at         TEXT
            );",
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS connections (
                id            TEXT NOT NULL PRIMARY KEY,
                user_id       TEXT NOT NULL,
                tenant_id     TEXT NOT NULL,
                access_token  TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                expires_at    TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS connections_by_user
                ON connections (user_id, updated_at);",
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS wallets (
                id                   TEXT NOT NULL PRIMARY KEY,
                user_id              TEXT NOT NULL,
                wallet               TEXT NOT NULL,
                pull_payments        INTEGER NOT NULL,
                push_payments        INTEGER NOT NULL,
                reconcile_name       TEXT,
                reconcile_mode       TEXT,
                xero_bank_account_id TEXT,
                tax_rate             TEXT,
                fee_handling         INTEGER NOT NULL,
                auto_reconcile       INTEGER NOT NULL,
                last_synced          TEXT,
                status               TEXT,
                notes                TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS wallets_single_pusher
                ON wallets (wallet) WHERE push_payments = 1;",
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS synced_payments (
                payment_hash             TEXT NOT NULL PRIMARY KEY,
                id                       TEXT NOT NULL,
                user_id                  TEXT NOT NULL,
                wallet_id                TEXT NOT NULL,
                xero_bank_transaction_id TEXT,
                currency                 TEXT,
                amount                   TEXT,
                reserved_at              TEXT NOT NULL,
                confirmed_at             TEXT
            );
            CREATE INDEX IF NOT EXISTS synced_payments_by_wallet
                ON synced_payments (wallet_id);",
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS payments (
                payment_hash TEXT NOT NULL PRIMARY KEY,
                wallet_id    TEXT NOT NULL,
                amount_msat  INTEGER NOT NULL,
                status       TEXT NOT NULL,
                memo         TEXT,
                time         TEXT NOT NULL,
                extra        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS payments_by_wallet
                ON payments (wallet_id);",
        )?;

        Ok(Sqlite { db })
    }

    fn pusher_conflict(&self, config: &WalletConfig) -> Result<bool, SqliteStorageError> {
        if !config.push_payments {
            return Ok(false);
        }
        let mut statement = self.db.prepare(
            "SELECT id FROM wallets WHERE wallet = :wallet AND push_payments = 1 AND id != :id",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":wallet", config.wallet.as_str().into()),
                (":id", config.id.as_str().into()),
            ][..],
        )?;
        Ok(statement.next()? == State::Row)
    }
}

impl SettingsStorage for Sqlite {
    type Error = SqliteStorageError;

    fn get(&self, user_id: &str) -> Result<Option<ExtensionSettings>, Self::Error> {
        let mut statement = self.db.prepare("SELECT * FROM settings WHERE user_id = ?")?;
        statement.bind((1, user_id))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        Ok(Some(ExtensionSettings {
            user_id: statement.read::<String, _>("user_id")?,
            xero_client_id: statement.read::<Option<String>, _>("xero_client_id")?,
            xero_client_secret: statement.read::<Option<String>, _>("xero_client_secret")?,
            xero_tax_standard: statement.read::<Option<String>, _>("xero_tax_standard")?,
            xero_tax_zero: statement.read::<Option<String>, _>("xero_tax_zero")?,
            xero_tax_exempt: statement.read::<Option<String>, _>("xero_tax_exempt")?,
            updated_at: read_optional_timestamp(&statement, "updated_at")?,
        }))
    }

    fn upsert(
        &mut self,
        settings: ExtensionSettings,
    ) -> Result<Option<ExtensionSettings>, Self::Error> {
        let previous = SettingsStorage::get(self, &settings.user_id)?;

        let mut statement = self.db.prepare(
            "INSERT OR REPLACE INTO settings (user_id, xero_client_id, xero_client_secret,
                xero_tax_standard, xero_tax_zero, xero_tax_exempt, updated_at)
            VALUES (:user_id, :client_id, :client_secret, :standard, :zero, :exempt, :updated_at)",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":user_id", settings.user_id.as_str().into()),
                (":client_id", text(settings.xero_client_id.as_deref())),
                (":client_secret", text(settings.xero_client_secret.as_deref())),
                (":standard", text(settings.xero_tax_standard.as_deref())),
                (":zero", text(settings.xero_tax_zero.as_deref())),
                (":exempt", text(settings.xero_tax_exempt.as_deref())),
                (":updated_at", optional_timestamp(settings.updated_at)),
            ][..],
        )?;
        run(&mut statement)?;

        Ok(previous)
    }
}

impl ConnectionStorage for Sqlite {
    type Error = SqliteStorageError;

    fn get_latest(&self, user_id: &str) -> Result<Option<XeroConnection>, Self::Error> {
        let mut statement = self.db.prepare(
            "SELECT * FROM connections WHERE user_id = ? ORDER BY updated_at DESC LIMIT 1",
        )?;
        statement.bind((1, user_id))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        read_connection(&statement).map(Some)
    }

    fn insert(&mut self, connection: XeroConnection) -> Result<(), Self::Error> {
        let mut statement = self.db.prepare(
            "INSERT INTO connections (id, user_id, tenant_id, access_token, refresh_token,
                expires_at, created_at, updated_at)
            VALUES (:id, :user_id, :tenant_id, :access_token, :refresh_token,
                :expires_at, :created_at, :updated_at)
            ON CONFLICT (id) DO NOTHING",
        )?;
        statement.bind::<&[(_, Value)]>(&connection_values(&connection)[..])?;
        run(&mut statement)?;

        if self.db.change_count() == 0 {
            return Err(SqliteStorageError::DuplicateConnection);
        }
        Ok(())
    }

    fn update(
        &mut self,
        connection: XeroConnection,
    ) -> Result<Option<XeroConnection>, Self::Error> {
        let mut statement = self.db.prepare("SELECT * FROM connections WHERE id = ?")?;
        statement.bind((1, connection.id.as_str()))?;
        if statement.next()? == State::Done {
            return Ok(None);
        }
        let previous = read_connection(&statement)?;
        drop(statement);

        let mut statement = self.db.prepare(
            "UPDATE connections SET user_id = :user_id, tenant_id = :tenant_id,
                access_token = :access_token, refresh_token = :refresh_token,
                expires_at = :expires_at, created_at = :created_at, updated_at = :updated_at
            WHERE id = :id",
        )?;
        statement.bind::<&[(_, Value)]>(&connection_values(&connection)[..])?;
        run(&mut statement)?;

        Ok(Some(previous))
    }
}

impl WalletStorage for Sqlite {
    type Error = SqliteStorageError;

    fn insert(&mut self, config: WalletConfig) -> Result<(), Self::Error> {
        if self.pusher_conflict(&config)? {
            return Err(SqliteStorageError::DuplicatePusher(config.wallet));
        }

        let mut statement = self.db.prepare(
            "INSERT INTO wallets (id, user_id, wallet, pull_payments, push_payments,
                reconcile_name, reconcile_mode, xero_bank_account_id, tax_rate, fee_handling,
                auto_reconcile, last_synced, status, notes)
            VALUES (:id, :user_id, :wallet, :pull_payments, :push_payments,
                :reconcile_name, :reconcile_mode, :xero_bank_account_id, :tax_rate,
                :fee_handling, :auto_reconcile, :last_synced, :status, :notes)
            ON CONFLICT (id) DO NOTHING",
        )?;
        statement.bind::<&[(_, Value)]>(&wallet_values(&config)[..])?;
        run(&mut statement)?;

        if self.db.change_count() == 0 {
            return Err(SqliteStorageError::DuplicateWallet);
        }
        Ok(())
    }

    fn update(&mut self, config: WalletConfig) -> Result<Option<WalletConfig>, Self::Error> {
        let Some(previous) = WalletStorage::get(self, &config.id)? else {
            return Ok(None);
        };
        if self.pusher_conflict(&config)? {
            return Err(SqliteStorageError::DuplicatePusher(config.wallet));
        }

        let mut statement = self.db.prepare(
            "UPDATE wallets SET user_id = :user_id, wallet = :wallet,
                pull_payments = :pull_payments, push_payments = :push_payments,
                reconcile_name = :reconcile_name, reconcile_mode = :reconcile_mode,
                xero_bank_account_id = :xero_bank_account_id, tax_rate = :tax_rate,
                fee_handling = :fee_handling, auto_reconcile = :auto_reconcile,
                last_synced = :last_synced, status = :status, notes = :notes
            WHERE id = :id",
        )?;
        statement.bind::<&[(_, Value)]>(&wallet_values(&config)[..])?;
        run(&mut statement)?;

        Ok(Some(previous))
    }

    fn set_sync_status(
        &mut self,
        id: &str,
        last_synced: DateTime<Utc>,
        status: &str,
    ) -> Result<Option<WalletConfig>, Self::Error> {
        let mut statement = self.db.prepare(
            "UPDATE wallets SET last_synced = :last_synced, status = :status
            WHERE id = :id
            RETURNING *",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":id", id.into()),
                (":last_synced", timestamp(last_synced)),
                (":status", status.into()),
            ][..],
        )?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        let config = read_wallet(&statement)?;
        run(&mut statement)?;
        Ok(Some(config))
    }

    fn get(&self, id: &str) -> Result<Option<WalletConfig>, Self::Error> {
        let mut statement = self.db.prepare("SELECT * FROM wallets WHERE id = ?")?;
        statement.bind((1, id))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        read_wallet(&statement).map(Some)
    }

    fn get_pushing(&self, wallet: &str) -> Result<Option<WalletConfig>, Self::Error> {
        let mut statement = self
            .db
            .prepare("SELECT * FROM wallets WHERE wallet = ? AND push_payments = 1 LIMIT 1")?;
        statement.bind((1, wallet))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        read_wallet(&statement).map(Some)
    }

    fn remove(&mut self, id: &str) -> Result<Option<WalletConfig>, Self::Error> {
        let mut statement = self
            .db
            .prepare("DELETE FROM wallets WHERE id = ? RETURNING *")?;
        statement.bind((1, id))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        let config = read_wallet(&statement)?;
        run(&mut statement)?;
        Ok(Some(config))
    }
}

impl SyncedPaymentStorage for Sqlite {
    type Error = SqliteStorageError;

    fn reserve(&mut self, record: SyncedPayment) -> Result<Reservation, Self::Error> {
        let mut statement = self.db.prepare(
            "INSERT INTO synced_payments (payment_hash, id, user_id, wallet_id,
                xero_bank_transaction_id, currency, amount, reserved_at, confirmed_at)
            VALUES (:payment_hash, :id, :user_id, :wallet_id,
                :transaction_id, :currency, :amount, :reserved_at, :confirmed_at)
            ON CONFLICT (payment_hash) DO NOTHING",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":payment_hash", record.payment_hash.as_str().into()),
                (":id", record.id.as_str().into()),
                (":user_id", record.user_id.as_str().into()),
                (":wallet_id", record.wallet_id.as_str().into()),
                (
                    ":transaction_id",
                    text(record.xero_bank_transaction_id.as_deref()),
                ),
                (":currency", text(record.currency.as_deref())),
                (":amount", text(record.amount.map(|a| a.to_string()).as_deref())),
                (":reserved_at", timestamp(record.reserved_at)),
                (":confirmed_at", optional_timestamp(record.confirmed_at)),
            ][..],
        )?;
        run(&mut statement)?;

        if self.db.change_count() == 0 {
            return Ok(Reservation::AlreadyExists);
        }
        Ok(Reservation::Reserved)
    }

    fn confirm(
        &mut self,
        payment_hash: &str,
        confirmation: Confirmation,
    ) -> Result<Option<SyncedPayment>, Self::Error> {
        let mut statement = self.db.prepare(
            "UPDATE synced_payments SET xero_bank_transaction_id = :transaction_id,
                currency = :currency, amount = :amount, confirmed_at = :confirmed_at
            WHERE payment_hash = :payment_hash
            RETURNING *",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":payment_hash", payment_hash.into()),
                (
                    ":transaction_id",
                    text(confirmation.xero_bank_transaction_id.as_deref()),
                ),
                (":currency", confirmation.currency.as_str().into()),
                (":amount", confirmation.amount.to_string().into()),
                (":confirmed_at", timestamp(confirmation.confirmed_at)),
            ][..],
        )?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        let record = read_synced(&statement)?;
        run(&mut statement)?;
        Ok(Some(record))
    }

    fn release(&mut self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error> {
        let mut statement = self
            .db
            .prepare("DELETE FROM synced_payments WHERE payment_hash = ? RETURNING *")?;
        statement.bind((1, payment_hash))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        let record = read_synced(&statement)?;
        run(&mut statement)?;
        Ok(Some(record))
    }

    fn get(&self, payment_hash: &str) -> Result<Option<SyncedPayment>, Self::Error> {
        let mut statement = self
            .db
            .prepare("SELECT * FROM synced_payments WHERE payment_hash = ?")?;
        statement.bind((1, payment_hash))?;

        if statement.next()? == State::Done {
            return Ok(None);
        }
        read_synced(&statement).map(Some)
    }

    fn hashes_for_wallet(&self, wallet_id: &str) -> Result<HashSet<String>, Self::Error> {
        let mut statement = self
            .db
            .prepare("SELECT payment_hash FROM synced_payments WHERE wallet_id = ?")?;
        statement.bind((1, wallet_id))?;

        let mut hashes = HashSet::new();
        while statement.next()? == State::Row {
            hashes.insert(statement.read::<String, _>("payment_hash")?);
        }
        Ok(hashes)
    }

    fn remove_stale(&mut self, reserved_before: DateTime<Utc>) -> Result<Vec<String>, Self::Error> {
        let mut statement = self.db.prepare(
            "DELETE FROM synced_payments
            WHERE confirmed_at IS NULL AND xero_bank_transaction_id IS NULL
                AND reserved_at < ?
            RETURNING payment_hash",
        )?;
        statement.bind((1, format_timestamp(reserved_before).as_str()))?;

        let mut hashes = Vec::new();
        while statement.next()? == State::Row {
            hashes.push(statement.read::<String, _>("payment_hash")?);
        }
        Ok(hashes)
    }
}

impl PaymentStorage for Sqlite {
    type Error = SqliteStorageError;

    fn record(&mut self, payment: Payment) -> Result<Option<Payment>, Self::Error> {
        let mut statement = self
            .db
            .prepare("SELECT * FROM payments WHERE payment_hash = ?")?;
        statement.bind((1, payment.payment_hash.as_str()))?;
        let previous = if statement.next()? == State::Row {
            Some(read_payment(&statement)?)
        } else {
            None
        };
        drop(statement);

        let mut statement = self.db.prepare(
            "INSERT OR REPLACE INTO payments (payment_hash, wallet_id, amount_msat, status,
                memo, time, extra)
            VALUES (:payment_hash, :wallet_id, :amount_msat, :status, :memo, :time, :extra)",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":payment_hash", payment.payment_hash.as_str().into()),
                (":wallet_id", payment.wallet_id.as_str().into()),
                (":amount_msat", payment.amount_msat.into()),
                (":status", status_name(payment.status).into()),
                (":memo", text(payment.memo.as_deref())),
                (":time", timestamp(payment.time)),
                (":extra", serde_json::to_string(&payment.extra)?.into()),
            ][..],
        )?;
        run(&mut statement)?;

        Ok(previous)
    }

    fn completed_incoming(&self, wallet_id: &str) -> Result<Vec<Payment>, Self::Error> {
        let mut statement = self.db.prepare(
            "SELECT * FROM payments WHERE wallet_id = :wallet_id AND amount_msat > 0
                AND status = :status",
        )?;
        statement.bind::<&[(_, Value)]>(
            &[
                (":wallet_id", wallet_id.into()),
                (":status", status_name(PaymentStatus::Success).into()),
            ][..],
        )?;

        let mut payments = Vec::new();
        while statement.next()? == State::Row {
            payments.push(read_payment(&statement)?);
        }
        Ok(payments)
    }
}

impl Storage for Sqlite {
    type Error = SqliteStorageError;
}

/// Step a statement that is not expected to return rows to completion.
fn run(statement: &mut Statement<'_>) -> Result<(), SqliteStorageError> {
    while statement.next()? == State::Row {}
    Ok(())
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

/// Fixed-width RFC 3339, so that lexicographic order is chronological order.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn timestamp(value: DateTime<Utc>) -> Value {
    Value::String(format_timestamp(value))
}

fn optional_timestamp(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, timestamp)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, SqliteStorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SqliteStorageError::InvalidTimestamp(value.to_string(), e))
}

fn read_timestamp(statement: &Statement<'_>, column: &str) -> Result<DateTime<Utc>, SqliteStorageError> {
    parse_timestamp(&statement.read::<String, _>(column)?)
}

fn read_optional_timestamp(
    statement: &Statement<'_>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, SqliteStorageError> {
    statement
        .read::<Option<String>, _>(column)?
        .as_deref()
        .map(parse_timestamp)
        .transpose()
}

fn read_flag(statement: &Statement<'_>, column: &str) -> Result<bool, SqliteStorageError> {
    Ok(statement.read::<i64, _>(column)? != 0)
}

fn status_name(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Success => "success",
        PaymentStatus::Failed => "failed",
    }
}

fn connection_values(connection: &XeroConnection) -> [(&'static str, Value); 8] {
    [
        (":id", connection.id.as_str().into()),
        (":user_id", connection.user_id.as_str().into()),
        (":tenant_id", connection.tenant_id.as_str().into()),
        (":access_token", connection.access_token.as_str().into()),
        (":refresh_token", connection.refresh_token.as_str().into()),
        (":expires_at", timestamp(connection.expires_at)),
        (":created_at", timestamp(connection.created_at)),
        (":updated_at", timestamp(connection.updated_at)),
    ]
}

fn read_connection(statement: &Statement<'_>) -> Result<XeroConnection, SqliteStorageError> {
    Ok(XeroConnection {
        id: statement.read::<String, _>("id")?,
        user_id: statement.read::<String, _>("user_id")?,
        tenant_id: statement.read::<String, _>("tenant_id")?,
        access_token: statement.read::<String, _>("access_token")?,
        refresh_token: statement.read::<String, _>("refresh_token")?,
        expires_at: read_timestamp(statement, "expires_at")?,
        created_at: read_timestamp(statement, "created_at")?,
        updated_at: read_timestamp(statement, "updated_at")?,
    })
}

fn wallet_values(config: &WalletConfig) -> [(&'static str, Value); 14] {
    [
        (":id", config.id.as_str().into()),
        (":user_id", config.user_id.as_str().into()),
        (":wallet", config.wallet.as_str().into()),
        (":pull_payments", flag(config.pull_payments)),
        (":push_payments", flag(config.push_payments)),
        (":reconcile_name", text(config.reconcile_name.as_deref())),
        (":reconcile_mode", text(config.reconcile_mode.as_deref())),
        (
            ":xero_bank_account_id",
            text(config.xero_bank_account_id.as_deref()),
        ),
        (":tax_rate", text(config.tax_rate.as_str())),
        (":fee_handling", flag(config.fee_handling)),
        (":auto_reconcile", flag(config.auto_reconcile)),
        (":last_synced", optional_timestamp(config.last_synced)),
        (":status", text(config.status.as_deref())),
        (":notes", text(config.notes.as_deref())),
    ]
}

fn read_wallet(statement: &Statement<'_>) -> Result<WalletConfig, SqliteStorageError> {
    Ok(WalletConfig {
        id: statement.read::<String, _>("id")?,
        user_id: statement.read::<String, _>("user_id")?,
        wallet: statement.read::<String, _>("wallet")?,
        pull_payments: read_flag(statement, "pull_payments")?,
        push_payments: read_flag(statement, "push_payments")?,
        reconcile_name: statement.read::<Option<String>, _>("reconcile_name")?,
        reconcile_mode: statement.read::<Option<String>, _>("reconcile_mode")?,
        xero_bank_account_id: statement.read::<Option<String>, _>("xero_bank_account_id")?,
        tax_rate: TaxRateCategory::from(statement.read::<Option<String>, _>("tax_rate")?),
        fee_handling: read_flag(statement, "fee_handling")?,
        auto_reconcile: read_flag(statement, "auto_reconcile")?,
        last_synced: read_optional_timestamp(statement, "last_synced")?,
        status: statement.read::<Option<String>, _>("status")?,
        notes: statement.read::<Option<String>, _>("notes")?,
    })
}

fn read_synced(statement: &Statement<'_>) -> Result<SyncedPayment, SqliteStorageError> {
    let amount = statement
        .read::<Option<String>, _>("amount")?
        .map(|amount| {
            Decimal::from_str(&amount).map_err(|_| SqliteStorageError::InvalidAmount(amount))
        })
        .transpose()?;
    Ok(SyncedPayment {
        id: statement.read::<String, _>("id")?,
        user_id: statement.read::<String, _>("user_id")?,
        wallet_id: statement.read::<String, _>("wallet_id")?,
        payment_hash: statement.read::<String, _>("payment_hash")?,
        xero_bank_transaction_id: statement.read::<Option<String>, _>("xero_bank_transaction_id")?,
        currency: statement.read::<Option<String>, _>("currency")?,
        amount,
        reserved_at: read_timestamp(statement, "reserved_at")?,
        confirmed_at: read_optional_timestamp(statement, "confirmed_at")?,
    })
}

fn read_payment(statement: &Statement<'_>) -> Result<Payment, SqliteStorageError> {
    let status = match statement.read::<String, _>("status")?.as_str() {
        "pending" => PaymentStatus::Pending,
        "success" => PaymentStatus::Success,
        _ => PaymentStatus::Failed,
    };
    Ok(Payment {
        payment_hash: statement.read::<String, _>("payment_hash")?,
        wallet_id: statement.read::<String, _>("wallet_id")?,
        amount_msat: statement.read::<i64, _>("amount_msat")?,
        status,
        memo: statement.read::<Option<String>, _>("memo")?,
        time: read_timestamp(statement, "time")?,
        extra: serde_json::from_str(&statement.read::<String, _>("extra")?)?,
    })
}

/// An error occurring while storing or retrieving values in `SQLite`.
#[derive(Error, Debug)]
pub enum SqliteStorageError {
    /// An error caused by the database, or some interaction with it.
    #[error("database error: {0}")]
    Database(#[from] sqlite::Error),
    /// Attempted to insert a connection which already exists.
    #[error("attempted to insert a connection which already exists")]
    DuplicateConnection,
    /// Attempted to insert a wallet configuration which already exists.
    #[error("attempted to insert a wallet configuration which already exists")]
    DuplicateWallet,
    /// Attempted to enable pushing on a wallet that is already pushed by
    /// another configuration.
    #[error("wallet {0} is already pushed by another configuration")]
    DuplicatePusher(String),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in database \"{0}\": {1}")]
    InvalidTimestamp(String, chrono::ParseError),
    /// A stored amount could not be parsed.
    #[error("invalid amount in database: {0}")]
    InvalidAmount(String),
    /// Payment metadata could not be (de)serialized.
    #[error("invalid payment metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
