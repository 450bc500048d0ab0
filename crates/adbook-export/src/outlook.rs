//! Outlook contact store
//!
//! Drives a locally installed Outlook through COM automation (`IDispatch`
//! late binding). Stores are Outlook data files (`.pst`) attached to the
//! MAPI session of the running Outlook instance.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use thiserror::Error;
use tracing::{debug, warn};
use winapi::shared::guiddef::{CLSID, IID_NULL};
use winapi::shared::minwindef::{UINT, WORD};
use winapi::shared::winerror::{
    DISP_E_EXCEPTION, DISP_E_TYPEMISMATCH, E_OUTOFMEMORY, E_POINTER, FAILED, HRESULT,
    RPC_E_CHANGED_MODE,
};
use winapi::shared::wtypes::{BSTR, VARTYPE, VT_BSTR, VT_DISPATCH, VT_I4};
use winapi::shared::wtypesbase::CLSCTX_LOCAL_SERVER;
use winapi::um::combaseapi::{CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoUninitialize};
use winapi::um::oaidl::{IDispatch, DISPID, DISPPARAMS, EXCEPINFO, VARIANT};
use winapi::um::objbase::COINIT_APARTMENTTHREADED;
use winapi::um::oleauto::{
    SysAllocString, SysFreeString, SysStringLen, VariantClear, VariantInit, DISPATCH_METHOD,
    DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT,
};
use winapi::Interface;

use adbook_core::{ContactFields, ContactId};

use crate::client::MailClient;
use crate::error::{ExportError, ExportResult};

const OUTLOOK_PROG_ID: &str = "Outlook.Application";
const CONTACT_MESSAGE_CLASS: &str = "IPM.Contact";
const OL_FOLDER_CONTACTS: i32 = 10;
const LOCALE_USER_DEFAULT: u32 = 0x0400;
const DISPID_PROPERTYPUT: DISPID = -3;

/// A failed COM call.
#[derive(Debug, Error)]
#[error("{call} failed with HRESULT 0x{:08X}{}", .hr as u32, suffix(.description))]
pub struct ComError {
    call: String,
    hr: HRESULT,
    description: Option<String>,
}

impl ComError {
    fn new(call: impl Into<String>, hr: HRESULT) -> Self {
        Self {
            call: call.into(),
            hr,
            description: None,
        }
    }

    fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }
}

fn suffix(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(": {}", d.trim()))
        .unwrap_or_default()
}

fn check(call: &str, hr: HRESULT) -> Result<(), ComError> {
    if FAILED(hr) {
        Err(ComError::new(call, hr))
    } else {
        Ok(())
    }
}

fn to_wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(std::iter::once(0)).collect()
}

/// Copy the contents of a BSTR.
///
/// # Safety
///
/// `bstr` must be a valid, non-null BSTR.
unsafe fn bstr_text(bstr: BSTR) -> String {
    let len = SysStringLen(bstr) as usize;
    String::from_utf16_lossy(std::slice::from_raw_parts(bstr, len))
}

/// Read and free a BSTR handed over by the callee.
///
/// # Safety
///
/// `bstr` must be null or a BSTR the caller owns and does not use again.
unsafe fn take_bstr(bstr: BSTR) -> Option<String> {
    if bstr.is_null() {
        return None;
    }
    let text = bstr_text(bstr);
    SysFreeString(bstr);
    Some(text)
}

/// Take the description out of a filled `EXCEPINFO`, freeing its strings.
///
/// # Safety
///
/// `excep` must have been filled by a failed `Invoke` and not read before.
unsafe fn take_exception(excep: &mut EXCEPINFO) -> Option<String> {
    if let Some(fill) = excep.pfnDeferredFillIn {
        fill(excep);
    }
    let _ = take_bstr(excep.bstrSource);
    let _ = take_bstr(excep.bstrHelpFile);
    let description = take_bstr(excep.bstrDescription);
    excep.bstrSource = ptr::null_mut();
    excep.bstrHelpFile = ptr::null_mut();
    excep.bstrDescription = ptr::null_mut();
    description
}

/// COM initialization for the current thread, undone on drop.
struct Apartment {
    initialized: bool,
}

impl Apartment {
    fn enter() -> Result<Self, ComError> {
        // SAFETY: the reserved argument must be null; the call has no other preconditions.
        let hr = unsafe { CoInitializeEx(ptr::null_mut(), COINIT_APARTMENTTHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            // Another component already initialized COM on this thread.
            return Ok(Self { initialized: false });
        }
        check("CoInitializeEx", hr)?;
        Ok(Self { initialized: true })
    }
}

impl Drop for Apartment {
    fn drop(&mut self) {
        if self.initialized {
            // SAFETY: balanced with the successful CoInitializeEx in `enter`.
            unsafe { CoUninitialize() };
        }
    }
}

/// Owned `IDispatch` reference, released on drop.
struct Dispatch(NonNull<IDispatch>);

/// Argument of a late-bound call.
enum Arg<'a> {
    Str(&'a str),
    Int(i32),
    Object(&'a Dispatch),
}

impl Arg<'_> {
    fn to_variant(&self) -> Result<Variant, ComError> {
        let mut variant = Variant::empty();
        // SAFETY: the variant is freshly initialized and its tag is set together with the payload.
        unsafe {
            let inner = variant.0.n1.n2_mut();
            match self {
                Arg::Str(s) => {
                    let wide = to_wide(s);
                    let bstr: BSTR = SysAllocString(wide.as_ptr());
                    if bstr.is_null() {
                        return Err(ComError::new("SysAllocString", E_OUTOFMEMORY));
                    }
                    inner.vt = VT_BSTR as VARTYPE;
                    *inner.n3.bstrVal_mut() = bstr;
                }
                Arg::Int(n) => {
                    inner.vt = VT_I4 as VARTYPE;
                    *inner.n3.lVal_mut() = *n;
                }
                Arg::Object(object) => {
                    // VariantClear releases this extra reference.
                    object.0.as_ref().AddRef();
                    inner.vt = VT_DISPATCH as VARTYPE;
                    *inner.n3.pdispVal_mut() = object.0.as_ptr();
                }
            }
        }
        Ok(variant)
    }
}

/// Owned `VARIANT`, cleared on drop.
#[repr(transparent)]
struct Variant(VARIANT);

impl Variant {
    fn empty() -> Self {
        // SAFETY: VariantInit only writes the tag of the zeroed variant.
        unsafe {
            let mut raw: VARIANT = std::mem::zeroed();
            VariantInit(&mut raw);
            Self(raw)
        }
    }

    fn vt(&self) -> VARTYPE {
        // SAFETY: the tag is always initialized.
        unsafe { self.0.n1.n2().vt }
    }

    fn into_dispatch(self, call: &str) -> Result<Dispatch, ComError> {
        if self.vt() != VT_DISPATCH as VARTYPE {
            return Err(ComError::new(
                format!("{call} (expected an object)"),
                DISP_E_TYPEMISMATCH,
            ));
        }
        // SAFETY: the tag says the payload is an IDispatch pointer. The variant's
        // reference is handed to the returned wrapper with an AddRef before the clear.
        unsafe {
            let raw = *self.0.n1.n2().n3.pdispVal();
            let ptr = NonNull::new(raw)
                .ok_or_else(|| ComError::new(format!("{call} (null object)"), E_POINTER))?;
            ptr.as_ref().AddRef();
            Ok(Dispatch(ptr))
        }
    }

    fn to_i32(&self) -> Option<i32> {
        if self.vt() == VT_I4 as VARTYPE {
            // SAFETY: the tag says the payload is a 32-bit integer.
            Some(unsafe { *self.0.n1.n2().n3.lVal() })
        } else {
            None
        }
    }

    fn to_text(&self) -> Option<String> {
        if self.vt() != VT_BSTR as VARTYPE {
            return None;
        }
        // SAFETY: the tag says the payload is a BSTR owned by this variant.
        unsafe {
            let bstr = *self.0.n1.n2().n3.bstrVal();
            if bstr.is_null() {
                return Some(String::new());
            }
            Some(bstr_text(bstr))
        }
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        // SAFETY: the variant is always in a valid state.
        unsafe {
            VariantClear(&mut self.0);
        }
    }
}

impl Dispatch {
    fn id_of(&self, name: &str) -> Result<DISPID, ComError> {
        let mut wide = to_wide(name);
        let mut names = wide.as_mut_ptr();
        let mut id: DISPID = 0;
        // SAFETY: one valid, null-terminated name and one output slot are passed.
        let hr = unsafe {
            self.0
                .as_ref()
                .GetIDsOfNames(&IID_NULL, &mut names, 1, LOCALE_USER_DEFAULT, &mut id)
        };
        check(name, hr)?;
        Ok(id)
    }

    fn invoke(&self, name: &str, flags: WORD, args: &[Arg<'_>]) -> Result<Variant, ComError> {
        let id = self.id_of(name)?;

        // IDispatch expects arguments last to first.
        let mut values = args
            .iter()
            .rev()
            .map(Arg::to_variant)
            .collect::<Result<Vec<_>, _>>()?;
        let mut put_id = DISPID_PROPERTYPUT;
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let mut params = DISPPARAMS {
            rgvarg: if values.is_empty() {
                ptr::null_mut()
            } else {
                values.as_mut_ptr().cast::<VARIANT>()
            },
            rgdispidNamedArgs: if is_put { &mut put_id } else { ptr::null_mut() },
            cArgs: values.len() as UINT,
            cNamedArgs: u32::from(is_put),
        };

        let mut result = Variant::empty();
        // SAFETY: zeroed EXCEPINFO is the documented initial state.
        let mut excep: EXCEPINFO = unsafe { std::mem::zeroed() };
        let mut arg_err: UINT = 0;
        // SAFETY: all pointers reference locals that outlive the call.
        let hr = unsafe {
            self.0.as_ref().Invoke(
                id,
                &IID_NULL,
                LOCALE_USER_DEFAULT,
                flags,
                &mut params,
                &mut result.0,
                &mut excep,
                &mut arg_err,
            )
        };
        drop(values);

        if hr == DISP_E_EXCEPTION {
            // SAFETY: Invoke filled `excep` and transferred its strings to us.
            let description = unsafe { take_exception(&mut excep) };
            return Err(ComError::new(name, hr).with_description(description));
        }
        check(name, hr)?;
        Ok(result)
    }

    fn call(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, ComError> {
        self.invoke(name, DISPATCH_METHOD | DISPATCH_PROPERTYGET, args)
    }

    fn object(&self, name: &str, args: &[Arg<'_>]) -> Result<Dispatch, ComError> {
        self.call(name, args)?.into_dispatch(name)
    }

    fn put(&self, name: &str, value: &str) -> Result<(), ComError> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[Arg::Str(value)])
            .map(drop)
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        // SAFETY: this wrapper owns exactly one reference.
        unsafe {
            self.0.as_ref().Release();
        }
    }
}

/// An Outlook data file attached to the session.
pub struct OutlookStore {
    store: Dispatch,
    path: PathBuf,
}

/// The `Items` collection of a contacts folder.
pub struct OutlookFolder {
    items: Dispatch,
}

/// Mail client backed by a running Outlook instance.
pub struct OutlookClient {
    namespace: Dispatch,
    _application: Dispatch,
    _apartment: Apartment,
}

impl OutlookClient {
    /// Start or attach to Outlook and open its MAPI session.
    pub fn connect() -> ExportResult<Self> {
        let unavailable = |e: ComError| ExportError::ClientUnavailable {
            message: "cannot start Outlook; is it installed for this user?".to_string(),
            source: Some(Box::new(e)),
        };

        let apartment = Apartment::enter().map_err(unavailable)?;

        let prog_id = to_wide(OUTLOOK_PROG_ID);
        // SAFETY: zeroed CLSID is a valid output buffer.
        let mut clsid: CLSID = unsafe { std::mem::zeroed() };
        // SAFETY: the ProgID is null-terminated and the output is a local.
        let hr = unsafe { CLSIDFromProgID(prog_id.as_ptr(), &mut clsid) };
        check("CLSIDFromProgID", hr).map_err(unavailable)?;

        let mut raw: *mut IDispatch = ptr::null_mut();
        // SAFETY: the output pointer receives one IDispatch reference on success.
        let hr = unsafe {
            CoCreateInstance(
                &clsid,
                ptr::null_mut(),
                CLSCTX_LOCAL_SERVER,
                &IDispatch::uuidof(),
                &mut raw as *mut *mut IDispatch as *mut _,
            )
        };
        check("CoCreateInstance", hr).map_err(unavailable)?;
        let application = NonNull::new(raw).map(Dispatch).ok_or_else(|| {
            ExportError::client_unavailable("Outlook returned no application object")
        })?;

        let namespace = application
            .object("GetNamespace", &[Arg::Str("MAPI")])
            .map_err(unavailable)?;

        debug!("Connected to Outlook MAPI session");
        Ok(Self {
            namespace,
            _application: application,
            _apartment: apartment,
        })
    }

    fn find_store(&self, path: &Path) -> Result<Dispatch, ComError> {
        let stores = self.namespace.object("Stores", &[])?;
        let count = stores.call("Count", &[])?.to_i32().unwrap_or(0);
        let wanted = path.to_string_lossy().to_lowercase();

        for index in 1..=count {
            let store = stores.object("Item", &[Arg::Int(index)])?;
            let file_path = store
                .call("FilePath", &[])
                .ok()
                .and_then(|v| v.to_text())
                .unwrap_or_default();
            if file_path.to_lowercase() == wanted {
                return Ok(store);
            }
        }

        // AddStore appends, so the newest store is last.
        warn!(path = %path.display(), "Attached store not found by path, using the last store");
        stores.object("Item", &[Arg::Int(count)])
    }
}

impl MailClient for OutlookClient {
    type Store = OutlookStore;
    type Folder = OutlookFolder;

    fn name(&self) -> &str {
        "outlook"
    }

    fn store_extension(&self) -> &str {
        "pst"
    }

    fn create_store(&mut self, path: &Path) -> ExportResult<OutlookStore> {
        let path_text = path.to_string_lossy();
        self.namespace
            .call("AddStore", &[Arg::Str(&path_text)])
            .map_err(|e| ExportError::store_creation_with_source(path, "AddStore failed", e))?;

        let store = self
            .find_store(path)
            .map_err(|e| ExportError::store_creation_with_source(path, "store not attached", e))?;

        let path = store
            .call("FilePath", &[])
            .ok()
            .and_then(|v| v.to_text())
            .filter(|p| !p.is_empty())
            .map_or_else(|| path.to_path_buf(), PathBuf::from);

        Ok(OutlookStore { store, path })
    }

    fn store_path(&self, store: &OutlookStore) -> PathBuf {
        store.path.clone()
    }

    fn default_contacts_folder(&mut self, store: &OutlookStore) -> ExportResult<OutlookFolder> {
        let folder_err = |e: ComError| ExportError::FolderUnavailable {
            message: "store has no contacts folder".to_string(),
            source: Some(Box::new(e)),
        };

        let folder = store
            .store
            .object("GetDefaultFolder", &[Arg::Int(OL_FOLDER_CONTACTS)])
            .map_err(folder_err)?;
        let items = folder.object("Items", &[]).map_err(folder_err)?;
        Ok(OutlookFolder { items })
    }

    fn add_contact(
        &mut self,
        folder: &OutlookFolder,
        fields: &ContactFields,
    ) -> ExportResult<ContactId> {
        let commit = |e: ComError| {
            ExportError::item_commit_with_source(
                fields.email_address.clone(),
                "Outlook rejected the item",
                e,
            )
        };

        let item = folder
            .items
            .object("Add", &[Arg::Str(CONTACT_MESSAGE_CLASS)])
            .map_err(commit)?;

        item.put("Email1Address", &fields.email_address).map_err(commit)?;
        item.put("Email1DisplayName", &fields.email_display_name)
            .map_err(commit)?;
        if let Some(first) = &fields.first_name {
            item.put("FirstName", first).map_err(commit)?;
        }
        if let Some(last) = &fields.last_name {
            item.put("LastName", last).map_err(commit)?;
        }
        item.put("FullName", &fields.full_name).map_err(commit)?;
        item.call("Save", &[]).map_err(commit)?;

        let id = item
            .call("EntryID", &[])
            .ok()
            .and_then(|v| v.to_text())
            .unwrap_or_default();
        Ok(ContactId::new(id))
    }

    fn remove_store(&mut self, store: OutlookStore) -> ExportResult<()> {
        let detach = |e: ComError| ExportError::Detach {
            message: format!("RemoveStore failed for {}", store.path.display()),
            source: Some(Box::new(e)),
        };

        // RemoveStore takes the store's root folder, not the store itself.
        let root = store.store.object("GetRootFolder", &[]).map_err(detach)?;
        self.namespace
            .call("RemoveStore", &[Arg::Object(&root)])
            .map_err(detach)?;
        Ok(())
    }
}
