//! Local store schema for the backed-up tables.

pub const SCHEMA_VERSION: i32 = 1;

pub const CREATE_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        domain TEXT,
        team_id TEXT,
        name TEXT NOT NULL,
        handle TEXT,
        email TEXT,
        phone TEXT,
        picture TEXT,
        accent_id INTEGER NOT NULL DEFAULT 0,
        connection TEXT NOT NULL DEFAULT 'unconnected',
        deleted INTEGER NOT NULL DEFAULT 0,
        availability INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        remote_id TEXT NOT NULL,
        domain TEXT,
        name TEXT,
        creator TEXT,
        conversation_type INTEGER NOT NULL,
        team TEXT,
        muted_status INTEGER NOT NULL DEFAULT 0,
        last_event_time INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0,
        verified TEXT,
        unread_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS conversation_members (
        user_id TEXT NOT NULL,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        PRIMARY KEY (user_id, conversation_id)
    );

    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        message_type TEXT NOT NULL,
        user_id TEXT NOT NULL,
        client_id TEXT,
        content TEXT,
        protos BLOB,
        time INTEGER NOT NULL,
        local_time INTEGER NOT NULL,
        edit_time INTEGER NOT NULL DEFAULT 0,
        first_message INTEGER NOT NULL DEFAULT 0,
        members TEXT,
        message_state TEXT NOT NULL,
        ephemeral INTEGER,
        expiry_time INTEGER,
        expired INTEGER NOT NULL DEFAULT 0,
        quote TEXT,
        asset_id TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, time);

    CREATE TABLE IF NOT EXISTS assets (
        id TEXT PRIMARY KEY,
        token TEXT,
        domain TEXT,
        name TEXT NOT NULL,
        encryption TEXT NOT NULL,
        mime TEXT NOT NULL,
        sha BLOB,
        size INTEGER NOT NULL,
        source TEXT,
        preview TEXT,
        details TEXT NOT NULL,
        conversation_id TEXT
    );

    CREATE TABLE IF NOT EXISTS likes (
        message_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        action INTEGER NOT NULL,
        PRIMARY KEY (message_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS read_receipts (
        message_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        PRIMARY KEY (message_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS properties (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS key_values (
        key TEXT PRIMARY KEY,
        value TEXT
    );

    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        folder_type INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS conversation_folders (
        conversation_id TEXT NOT NULL,
        folder_id TEXT NOT NULL,
        PRIMARY KEY (conversation_id, folder_id)
    );

    INSERT OR REPLACE INTO schema_version (version) VALUES (1);
"#;
