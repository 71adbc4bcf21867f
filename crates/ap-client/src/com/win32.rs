//! `IDispatch` implementation of the automation seam.

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{
    CLSCTX_LOCAL_SERVER, CLSIDFromProgID, COINIT_APARTMENTTHREADED, CoCreateInstance,
    CoInitializeEx, CoUninitialize, DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET,
    DISPATCH_PROPERTYPUT, DISPPARAMS, IDispatch,
};
use windows::Win32::System::Variant::{
    VT_BOOL, VT_BSTR, VT_DISPATCH, VT_EMPTY, VT_I1, VT_I2, VT_I4, VT_I8, VT_INT, VT_NULL, VT_R4,
    VT_R8, VT_UI1, VT_UI2, VT_UI4, VT_UINT,
};
use windows::core::{BSTR, GUID, IUnknown, Interface, PCWSTR, VARIANT};

use super::dispatch::{AutomationDocument, AutomationServer, DispatchError, DispatchResult, Variant};

const LOCALE_USER_DEFAULT: u32 = 0x0400;
const DISPID_PROPERTYPUT: i32 = -3;

/// COM initialised for the current thread while alive.
struct ApartmentGuard {
    owned: bool,
}

impl ApartmentGuard {
    fn enter() -> DispatchResult<Self> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            // Thread already joined a multithreaded apartment; use it as is.
            return Ok(Self { owned: false });
        }
        hr.ok().map_err(|e| DispatchError::Unavailable {
            message: format!("CoInitializeEx failed: {}", e),
        })?;
        Ok(Self { owned: true })
    }
}

impl Drop for ApartmentGuard {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

/// Local server activation through the registry.
pub struct ComServer;

impl AutomationServer for ComServer {
    fn create(&self, prog_id: &str) -> DispatchResult<Box<dyn AutomationDocument>> {
        let apartment = ApartmentGuard::enter()?;
        let wide = to_wide(prog_id);
        let unavailable = |e: windows::core::Error| DispatchError::Unavailable {
            message: e.to_string(),
        };

        let clsid = unsafe { CLSIDFromProgID(PCWSTR(wide.as_ptr())) }.map_err(unavailable)?;
        let doc: IDispatch =
            unsafe { CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER) }.map_err(unavailable)?;

        Ok(Box::new(ComDocument {
            doc,
            _apartment: apartment,
        }))
    }
}

/// A live document. Field order matters: the interface is released before
/// the apartment is left.
struct ComDocument {
    doc: IDispatch,
    _apartment: ApartmentGuard,
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn call_error(member: &str, e: windows::core::Error) -> DispatchError {
    DispatchError::Call {
        member: member.to_string(),
        message: e.to_string(),
    }
}

fn dispid(target: &IDispatch, name: &str) -> DispatchResult<i32> {
    let wide = to_wide(name);
    let names = [PCWSTR(wide.as_ptr())];
    let mut id = 0i32;
    unsafe {
        target.GetIDsOfNames(
            &GUID::zeroed(),
            names.as_ptr(),
            1,
            LOCALE_USER_DEFAULT,
            &mut id,
        )
    }
    .map_err(|_| DispatchError::UnknownMember {
        member: name.to_string(),
    })?;
    Ok(id)
}

fn invoke(
    target: &IDispatch,
    name: &str,
    flags: DISPATCH_FLAGS,
    args: &[Variant],
) -> DispatchResult<VARIANT> {
    let id = dispid(target, name)?;
    // Dispatch arguments are passed last to first.
    let mut raw: Vec<VARIANT> = args.iter().rev().map(to_variant).collect();
    let mut named = DISPID_PROPERTYPUT;
    let is_put = flags == DISPATCH_PROPERTYPUT;
    let params = DISPPARAMS {
        rgvarg: if raw.is_empty() {
            std::ptr::null_mut()
        } else {
            raw.as_mut_ptr()
        },
        rgdispidNamedArgs: if is_put { &mut named } else { std::ptr::null_mut() },
        cArgs: raw.len() as u32,
        cNamedArgs: u32::from(is_put),
    };

    let mut result = VARIANT::default();
    unsafe {
        target.Invoke(
            id,
            &GUID::zeroed(),
            LOCALE_USER_DEFAULT,
            flags,
            &params,
            Some(&mut result as *mut VARIANT),
            None,
            None,
        )
    }
    .map_err(|e| call_error(name, e))?;
    Ok(result)
}

fn as_dispatch(value: &VARIANT, member: &str) -> DispatchResult<IDispatch> {
    if value.vt() != VT_DISPATCH {
        return Err(DispatchError::Call {
            member: member.to_string(),
            message: "did not return an object".to_string(),
        });
    }
    IUnknown::try_from(value)
        .and_then(|unknown| unknown.cast::<IDispatch>())
        .map_err(|e| call_error(member, e))
}

fn get_object(target: &IDispatch, member: &str) -> DispatchResult<IDispatch> {
    let value = invoke(target, member, DISPATCH_PROPERTYGET, &[])?;
    as_dispatch(&value, member)
}

fn to_variant(value: &Variant) -> VARIANT {
    match value {
        Variant::Empty => VARIANT::default(),
        Variant::Bool(b) => VARIANT::from(*b),
        Variant::Int(v) => match i32::try_from(*v) {
            Ok(n) => VARIANT::from(n),
            Err(_) => VARIANT::from(*v as f64),
        },
        Variant::Real(v) => VARIANT::from(*v),
        Variant::Text(s) => VARIANT::from(BSTR::from(s.as_str())),
    }
}

fn from_variant(value: &VARIANT) -> Variant {
    let vt = value.vt();
    if vt == VT_EMPTY || vt == VT_NULL {
        Variant::Empty
    } else if vt == VT_BOOL {
        bool::try_from(value).map(Variant::Bool).unwrap_or(Variant::Empty)
    } else if [VT_I1, VT_I2, VT_I4, VT_I8, VT_INT, VT_UI1, VT_UI2, VT_UI4, VT_UINT].contains(&vt) {
        i64::try_from(value).map(Variant::Int).unwrap_or(Variant::Empty)
    } else if vt == VT_R4 || vt == VT_R8 {
        f64::try_from(value).map(Variant::Real).unwrap_or(Variant::Empty)
    } else if vt == VT_BSTR {
        BSTR::try_from(value)
            .map(|s| Variant::Text(s.to_string()))
            .unwrap_or(Variant::Empty)
    } else {
        f64::try_from(value).map(Variant::Real).unwrap_or(Variant::Empty)
    }
}

impl ComDocument {
    /// Object owning the last segment of a dotted member path.
    fn resolve<'m>(&self, member: &'m str) -> DispatchResult<(IDispatch, &'m str)> {
        let mut target = self.doc.clone();
        let mut parts = member.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                return Ok((target, part));
            }
            target = get_object(&target, part)?;
        }
        Err(DispatchError::UnknownMember {
            member: member.to_string(),
        })
    }

    fn find_node(&self, path: &str) -> DispatchResult<IDispatch> {
        let tree = get_object(&self.doc, "Tree")?;
        let found = invoke(
            &tree,
            "FindNode",
            DISPATCH_METHOD | DISPATCH_PROPERTYGET,
            &[Variant::Text(path.to_string())],
        )?;
        as_dispatch(&found, "FindNode").map_err(|_| DispatchError::NodeNotFound {
            path: path.to_string(),
        })
    }
}

impl AutomationDocument for ComDocument {
    fn has_member(&mut self, member: &str) -> bool {
        self.resolve(member)
            .and_then(|(target, name)| dispid(&target, name))
            .is_ok()
    }

    fn call(&mut self, member: &str, args: &[Variant]) -> DispatchResult<Variant> {
        let (target, name) = self.resolve(member)?;
        let value = invoke(&target, name, DISPATCH_METHOD | DISPATCH_PROPERTYGET, args)?;
        Ok(from_variant(&value))
    }

    fn get(&mut self, member: &str) -> DispatchResult<Variant> {
        let (target, name) = self.resolve(member)?;
        let value = invoke(&target, name, DISPATCH_PROPERTYGET, &[])?;
        Ok(from_variant(&value))
    }

    fn put(&mut self, member: &str, value: Variant) -> DispatchResult<()> {
        let (target, name) = self.resolve(member)?;
        invoke(&target, name, DISPATCH_PROPERTYPUT, &[value])?;
        Ok(())
    }

    fn read_node(&mut self, path: &str) -> DispatchResult<Variant> {
        let node = self.find_node(path)?;
        let value = invoke(&node, "Value", DISPATCH_PROPERTYGET, &[])?;
        Ok(from_variant(&value))
    }

    fn write_node(&mut self, path: &str, value: Variant) -> DispatchResult<()> {
        let node = self.find_node(path)?;
        invoke(&node, "Value", DISPATCH_PROPERTYPUT, &[value])?;
        Ok(())
    }

    fn node_children(&mut self, path: &str) -> DispatchResult<Vec<String>> {
        let node = self.find_node(path)?;
        let elements = get_object(&node, "Elements")?;
        let count = invoke(&elements, "Count", DISPATCH_PROPERTYGET, &[])
            .map(|v| from_variant(&v))?
            .as_f64()
            .unwrap_or(0.0) as i64;

        let mut names = Vec::new();
        for i in 0..count {
            let item = invoke(
                &elements,
                "Item",
                DISPATCH_METHOD | DISPATCH_PROPERTYGET,
                &[Variant::Int(i)],
            )?;
            let item = as_dispatch(&item, "Item")?;
            let name = invoke(&item, "Name", DISPATCH_PROPERTYGET, &[])?;
            if let Variant::Text(name) = from_variant(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}
