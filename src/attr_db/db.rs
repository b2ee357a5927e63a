use std::path::Path;

use redb::{Database, ReadableDatabase};
use tempfile::NamedTempFile;

use crate::{
    attr_db::{
        reader::AttrReader,
        tables::{
            GRAPH_ATTRS, GRAPH_NAMES, GRAPH_VALUES, KEYWORD_ATTRS, KEYWORD_NAMES, KEYWORD_VALUES,
            OBJECTS, PROTOCOLS, SEQUENCES, STATISTIC_ATTRS, STATISTIC_NAMES, STATISTIC_VALUES,
        },
        writer::AttrWriter,
    },
    errors::AttrError,
};

pub struct AttrDb {
    db: Database,
}

impl AttrDb {
    /// Creates or opens the specified file as a database.
    /// * Creates the file if it does not exist.
    /// * Returns an error if the existing file is an invalid db format.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, redb::Error> {
        let p = path.as_ref();
        let db = Database::create(p)?;
        let mut me = Self { db };
        me.init_tables()?;
        Ok(me)
    }

    /// Opens the specified existing database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, redb::Error> {
        let p = path.as_ref();
        let db = Database::open(p)?;
        Ok(Self { db })
    }

    /// Creates a temporary volatile database.
    pub fn create_temporary() -> Result<(AttrDb, NamedTempFile), redb::Error> {
        let file = NamedTempFile::new()?;
        let db = AttrDb::create(file.path())?;
        Ok((db, file))
    }

    // helper fn to initialize tables on startup
    fn init_tables(&mut self) -> Result<(), redb::Error> {
        let wt = self.db.begin_write()?;
        {
            let _ = wt.open_table(SEQUENCES)?;
            let _ = wt.open_table(KEYWORD_NAMES)?;
            let _ = wt.open_table(STATISTIC_NAMES)?;
            let _ = wt.open_table(GRAPH_NAMES)?;
            let _ = wt.open_table(KEYWORD_ATTRS)?;
            let _ = wt.open_table(STATISTIC_ATTRS)?;
            let _ = wt.open_table(GRAPH_ATTRS)?;
            let _ = wt.open_table(KEYWORD_VALUES)?;
            let _ = wt.open_table(STATISTIC_VALUES)?;
            let _ = wt.open_table(GRAPH_VALUES)?;
            let _ = wt.open_table(OBJECTS)?;
            let _ = wt.open_table(PROTOCOLS)?;
        }
        wt.commit()?;
        Ok(())
    }

    /// Begins a write transaction.
    pub fn begin_write<'h>(&self) -> Result<AttrWriter<'h>, AttrError> {
        let wt = self.db.begin_write()?;
        AttrWriter::new(wt)
    }

    /// Begins a read transaction.
    pub fn begin_read(&self) -> Result<AttrReader, redb::Error> {
        let rt = self.db.begin_read()?;
        Ok(AttrReader::new(rt))
    }
}
