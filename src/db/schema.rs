pub const SCHEMA: &str = r#"
-- File resource registry: stable integer refs to filesystem paths.
-- Authoritative for existence checks; albums and pictures reference
-- files only through this table.
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    registered_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Albums: hierarchical collection nodes, each bound to one directory
CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pid INTEGER NOT NULL DEFAULT 0,        -- parent album, 0 = root
    name TEXT NOT NULL,
    alias TEXT UNIQUE,                     -- globally unique slug, set by binding
    owner INTEGER NOT NULL,
    assigned_dir INTEGER,                  -- resource ref, exactly one directory per album
    thumb INTEGER,                         -- picture id, NULL = no thumbnail
    caption TEXT,
    caption_type TEXT NOT NULL DEFAULT 'text',   -- 'text' or 'markdown'
    sort_key TEXT NOT NULL DEFAULT 'none',       -- last requested resort key
    file_prefix TEXT,
    preserve_filenames INTEGER NOT NULL DEFAULT 0,
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (assigned_dir) REFERENCES resources(id)
);

CREATE INDEX IF NOT EXISTS idx_albums_pid ON albums(pid);
CREATE INDEX IF NOT EXISTS idx_albums_alias ON albums(alias);

-- Pictures: file records owned by exactly one album, manually ordered
CREATE TABLE IF NOT EXISTS pictures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pid INTEGER NOT NULL,                  -- owning album
    resource_id INTEGER NOT NULL,          -- file ref into resources
    sorting INTEGER NOT NULL,              -- order weight, gaps of 10
    caption TEXT,
    owner INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (pid) REFERENCES albums(id),
    FOREIGN KEY (resource_id) REFERENCES resources(id)
);

CREATE INDEX IF NOT EXISTS idx_pictures_pid ON pictures(pid);
CREATE INDEX IF NOT EXISTS idx_pictures_resource ON pictures(resource_id);
CREATE INDEX IF NOT EXISTS idx_pictures_sorting ON pictures(pid, sorting);
"#;

/// Idempotent statements applied on every open; errors are ignored so a
/// column that already exists does not block startup.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE albums ADD COLUMN published INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE albums ADD COLUMN file_prefix TEXT",
    "ALTER TABLE albums ADD COLUMN preserve_filenames INTEGER NOT NULL DEFAULT 0",
];
